//! Issue rows and records

use serde::Deserialize;

use super::list::{millis_to_secs, null_as_default};
use crate::builder::issue::metric;
use crate::dsl::response::AggregateView;
use crate::filter::IssueCalculation;
use crate::result::{AggregationResult, IssueRecord};

/// Fill the metric fields of an issue row from its bucket
pub fn fill_metrics(row: &mut AggregationResult, bucket: AggregateView<'_>, calculation: IssueCalculation) {
    match calculation {
        IssueCalculation::TicketCount => {}
        IssueCalculation::StoryPoints => {
            row.story_points = Some(bucket.metric(metric::STORY_POINTS).unwrap_or(0.0));
        }
        IssueCalculation::Age => {
            if let Some(stats) = bucket.sub(metric::STATS) {
                row.min = stats.stat("min");
                row.max = stats.stat("max");
                row.sum = stats.stat("sum");
                row.mean = stats.stat("avg");
            }
            row.median = bucket.median(metric::MEDIAN);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Person {
    id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct NamedValue {
    #[serde(deserialize_with = "null_as_default")]
    name: String,
}

/// Work item document as stored in the index
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IssueDocument {
    #[serde(rename = "w_id")]
    id: Option<String>,
    #[serde(rename = "w_workitem_id")]
    key: Option<String>,
    #[serde(rename = "w_summary")]
    summary: Option<String>,
    #[serde(rename = "w_project")]
    project: Option<String>,
    #[serde(rename = "w_status")]
    status: Option<String>,
    #[serde(rename = "w_status_category")]
    status_category: Option<String>,
    #[serde(rename = "w_priority")]
    priority: Option<String>,
    #[serde(rename = "w_workitem_type")]
    issue_type: Option<String>,
    #[serde(rename = "w_assignee")]
    assignee: Option<Person>,
    #[serde(rename = "w_reporter")]
    reporter: Option<Person>,
    #[serde(rename = "w_epic")]
    epic: Option<String>,
    #[serde(rename = "w_labels", deserialize_with = "null_as_default")]
    labels: Vec<NamedValue>,
    #[serde(rename = "w_components", deserialize_with = "null_as_default")]
    components: Vec<NamedValue>,
    #[serde(rename = "w_story_points")]
    story_points: Option<f64>,
    #[serde(rename = "w_age")]
    age: Option<i64>,
    #[serde(rename = "w_created_at")]
    created_at: Option<i64>,
    #[serde(rename = "w_updated_at")]
    updated_at: Option<i64>,
    #[serde(rename = "w_resolved_at")]
    resolved_at: Option<i64>,
}

/// Listing record
pub fn to_record(doc_id: String, doc: IssueDocument) -> IssueRecord {
    IssueRecord {
        id: doc.id.unwrap_or(doc_id),
        key: doc.key,
        summary: doc.summary,
        project: doc.project,
        status: doc.status,
        status_category: doc.status_category,
        priority: doc.priority,
        issue_type: doc.issue_type,
        assignee_id: doc.assignee.and_then(|p| p.id),
        reporter_id: doc.reporter.and_then(|p| p.id),
        epic: doc.epic,
        labels: doc.labels.into_iter().map(|l| l.name).collect(),
        components: doc.components.into_iter().map(|c| c.name).collect(),
        story_points: doc.story_points,
        age: doc.age,
        created_at: millis_to_secs(doc.created_at),
        updated_at: millis_to_secs(doc.updated_at),
        resolved_at: millis_to_secs(doc.resolved_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_story_points_default_zero() {
        let raw = json!({ "doc_count": 2 });
        let mut row = AggregationResult::new("PROJ", 2);
        fill_metrics(&mut row, AggregateView::new(&raw), IssueCalculation::StoryPoints);
        assert_eq!(row.story_points, Some(0.0));
    }

    #[test]
    fn test_age_stats() {
        let raw = json!({
            "doc_count": 2,
            "stats": { "min": 1.0, "max": 9.0, "avg": 5.0, "sum": 10.0 },
            "median": { "values": { "50.0": 5.0 } }
        });
        let mut row = AggregationResult::new("PROJ", 2);
        fill_metrics(&mut row, AggregateView::new(&raw), IssueCalculation::Age);
        assert_eq!(row.mean, Some(5.0));
        assert_eq!(row.median, Some(5.0));
    }

    #[test]
    fn test_record_people_and_arrays() {
        let doc: IssueDocument = serde_json::from_value(json!({
            "w_workitem_id": "PROJ-1",
            "w_assignee": { "id": "u1" },
            "w_components": [ { "name": "api" }, { "name": "ui" } ],
            "w_created_at": 86_400_000
        }))
        .unwrap();
        let record = to_record("d1".to_string(), doc);
        assert_eq!(record.key.as_deref(), Some("PROJ-1"));
        assert_eq!(record.assignee_id.as_deref(), Some("u1"));
        assert_eq!(record.reporter_id, None);
        assert_eq!(record.components, vec!["api", "ui"]);
        assert_eq!(record.created_at, Some(86_400));
    }
}
