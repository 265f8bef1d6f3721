use crate::session::error::ReportError;
use crate::session::model::{ReconciliationResult, Response, Session, SessionKind};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const EXPORT_HEADER: [&str; 3] = ["Date", "Participant", "Outcome"];

const PRESENT: &str = "Present";
const ABSENT: &str = "Absent";
const NO_RESPONSE: &str = "No response";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HumanSummary {
    Attendance {
        present: usize,
        total: usize,
        absent: Vec<String>,
    },
    Tally {
        kind: SessionKind,
        tallies: Vec<(String, usize)>,
        answer: Option<String>,
        responses: usize,
        total: usize,
    },
}

impl HumanSummary {
    pub fn title(&self) -> String {
        match self {
            HumanSummary::Attendance { .. } => "Attendance results".to_string(),
            HumanSummary::Tally { kind: SessionKind::Quiz, .. } => "Quiz results".to_string(),
            HumanSummary::Tally { .. } => "Feedback results".to_string(),
        }
    }

    pub fn body(&self) -> String {
        match self {
            HumanSummary::Attendance { present, total, absent } => {
                let mut body = format!("Present: {}/{}\n", present, total);
                if absent.is_empty() {
                    body.push_str("Everyone is present!");
                } else {
                    body.push_str(&format!("Absent: {}", absent.join(", ")));
                }
                body
            }
            HumanSummary::Tally {
                tallies,
                answer,
                responses,
                total,
                ..
            } => {
                let mut body = String::new();
                for (index, (label, count)) in tallies.iter().enumerate() {
                    body.push_str(&format!("{}. {}: {}\n", index + 1, label, count));
                }
                body.push_str(&format!("Responses: {}/{}", responses, total));
                if let Some(answer) = answer {
                    body.push_str(&format!("\nCorrect answer: {}", answer));
                }
                body
            }
        }
    }

    /// Count for `label`, if this is a tally.
    #[cfg(test)]
    pub fn count_of(&self, label: &str) -> Option<usize> {
        match self {
            HumanSummary::Tally { tallies, .. } => tallies
                .iter()
                .find(|(option, _)| option == label)
                .map(|(_, count)| *count),
            HumanSummary::Attendance { .. } => None,
        }
    }
}

impl fmt::Display for HumanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.title(), self.body())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Participant")]
    pub participant: String,
    #[serde(rename = "Outcome")]
    pub outcome: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportTable {
    pub rows: Vec<ExportRow>,
}

impl ExportTable {
    pub fn to_csv(&self) -> Result<Vec<u8>, ReportError> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
        writer.write_record(EXPORT_HEADER)?;
        for row in &self.rows {
            writer.write_record([&row.date, &row.participant, &row.outcome])?;
        }
        writer.into_inner().map_err(|e| ReportError::Buffer(e.to_string()))
    }

    #[cfg(test)]
    pub fn from_csv(data: &[u8]) -> Result<Self, ReportError> {
        let mut reader = csv::Reader::from_reader(data);
        let headers = reader.headers()?.clone();
        if headers.iter().ne(EXPORT_HEADER) {
            return Err(ReportError::UnexpectedHeader(headers.iter().collect::<Vec<_>>().join(",")));
        }

        let rows = reader.deserialize().collect::<Result<Vec<ExportRow>, _>>()?;
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Renders reconciled sessions as chat summaries or export rows.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    offset: FixedOffset,
}

impl Reporter {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn summarize(&self, result: &ReconciliationResult) -> HumanSummary {
        let total = result.roster_size();

        if result.kind == SessionKind::Attendance {
            return HumanSummary::Attendance {
                present: result.responded.len(),
                total,
                absent: result.absent.iter().map(|p| p.name.clone()).collect(),
            };
        }

        let mut counts = vec![0usize; result.options.len()];
        for (_, response) in &result.responded {
            if let Response::Choice(index) = response {
                if let Some(count) = counts.get_mut(*index) {
                    *count += 1;
                }
            }
        }

        HumanSummary::Tally {
            kind: result.kind,
            tallies: result.options.iter().cloned().zip(counts).collect(),
            answer: result.answer.and_then(|index| result.options.get(index).cloned()),
            responses: result.responded.len(),
            total,
        }
    }

    /// One row per participant per session, sessions in the given order and
    /// participants in roster order.
    pub fn export(&self, sessions: &[Session]) -> Result<ExportTable, ReportError> {
        if sessions.is_empty() {
            return Err(ReportError::NoData);
        }

        let mut rows = Vec::new();
        for session in sessions {
            let date = session
                .created_at
                .with_timezone(&self.offset)
                .format("%Y-%m-%d")
                .to_string();

            for participant in session.roster() {
                rows.push(ExportRow {
                    date: date.clone(),
                    participant: participant.name.clone(),
                    outcome: outcome_label(session, session.response_of(participant.id)),
                });
            }
        }

        Ok(ExportTable { rows })
    }
}

fn outcome_label(session: &Session, response: Option<Response>) -> String {
    match response {
        Some(Response::Present) => PRESENT.to_string(),
        Some(Response::Choice(index)) => session
            .options
            .get(index)
            .cloned()
            .unwrap_or_else(|| NO_RESPONSE.to_string()),
        None if session.kind == SessionKind::Attendance => ABSENT.to_string(),
        None => NO_RESPONSE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::model::{
        ChannelKey, GroupingKey, OpenSession, Participant, ParticipantId, SessionDuration, SessionId,
    };
    use chrono::{TimeZone, Utc};

    fn reporter() -> Reporter {
        Reporter::new(FixedOffset::east_opt(9 * 3600).unwrap())
    }

    fn roster() -> Vec<Participant> {
        vec![
            Participant::new(1, "alice"),
            Participant::new(2, "bob"),
            Participant::new(3, "carol"),
            Participant::new(4, "dave"),
        ]
    }

    fn attendance(id: u64, day: u32, present: &[u64]) -> Session {
        let request = OpenSession::attendance(SessionId(id), SessionDuration::from_secs(60), roster(), ChannelKey(1));
        let created_at = Utc.with_ymd_and_hms(2024, 4, day, 20, 0, 0).unwrap();
        let mut session = Session::new(request, created_at, GroupingKey::Session(SessionId(id)));
        for participant in present {
            session.insert_response(ParticipantId(*participant), Response::Present);
        }
        session.close();
        session
    }

    fn yes_no_quiz(votes: &[(u64, usize)]) -> Session {
        let request = OpenSession::choices(
            SessionId(9),
            SessionKind::Quiz,
            SessionDuration::from_secs(60),
            roster(),
            vec!["yes".into(), "no".into()],
            Some(0),
            ChannelKey(1),
        );
        let mut session = Session::new(request, Utc::now(), GroupingKey::Session(SessionId(9)));
        for (participant, choice) in votes {
            session.insert_response(ParticipantId(*participant), Response::Choice(*choice));
        }
        session
    }

    #[test]
    fn quiz_tally_counts_each_option() {
        let session = yes_no_quiz(&[(1, 0), (2, 0), (3, 0), (4, 1)]);
        let summary = reporter().summarize(&session.reconcile());

        assert_eq!(summary.count_of("yes"), Some(3));
        assert_eq!(summary.count_of("no"), Some(1));
        assert!(summary.body().contains("Correct answer: yes"));
        assert_eq!(summary.title(), "Quiz results");
    }

    #[test]
    fn attendance_summary_lists_absentees() {
        let session = attendance(1, 1, &[2, 3]);
        let summary = reporter().summarize(&session.reconcile());

        assert_eq!(
            summary,
            HumanSummary::Attendance {
                present: 2,
                total: 4,
                absent: vec!["alice".into(), "dave".into()],
            }
        );
        assert!(summary.body().contains("Absent: alice, dave"));
    }

    #[test]
    fn attendance_summary_when_everyone_shows_up() {
        let session = attendance(1, 1, &[1, 2, 3, 4]);
        let summary = reporter().summarize(&session.reconcile());
        assert!(summary.body().contains("Everyone is present!"));
    }

    #[test]
    fn export_orders_sessions_then_roster() {
        let sessions = vec![attendance(2, 2, &[1]), attendance(1, 3, &[4])];
        let table = reporter().export(&sessions).unwrap();

        let outcomes: Vec<_> = table
            .rows
            .iter()
            .map(|row| (row.date.as_str(), row.participant.as_str(), row.outcome.as_str()))
            .collect();
        // 20:00 UTC is the next morning at +09:00.
        assert_eq!(
            outcomes,
            vec![
                ("2024-04-03", "alice", "Present"),
                ("2024-04-03", "bob", "Absent"),
                ("2024-04-03", "carol", "Absent"),
                ("2024-04-03", "dave", "Absent"),
                ("2024-04-04", "alice", "Absent"),
                ("2024-04-04", "bob", "Absent"),
                ("2024-04-04", "carol", "Absent"),
                ("2024-04-04", "dave", "Present"),
            ]
        );
    }

    #[test]
    fn export_without_sessions_is_no_data() {
        assert!(matches!(reporter().export(&[]), Err(ReportError::NoData)));
    }

    #[test]
    fn csv_round_trip_keeps_rows_and_order() {
        let mut sessions = vec![attendance(1, 1, &[1, 3])];
        let mut quiz = yes_no_quiz(&[(2, 1)]);
        quiz.close();
        sessions.push(quiz);
        let table = reporter().export(&sessions).unwrap();

        let csv = table.to_csv().unwrap();
        let text = String::from_utf8(csv.clone()).unwrap();
        assert!(text.starts_with("Date,Participant,Outcome\n"));

        let parsed = ExportTable::from_csv(&csv).unwrap();
        assert_eq!(parsed, table);
        assert_eq!(parsed.len(), 8);
    }

    #[test]
    fn names_with_commas_survive_csv() {
        let table = ExportTable {
            rows: vec![ExportRow {
                date: "2024-04-01".into(),
                participant: "Doe, \"JD\" Jane".into(),
                outcome: "Present".into(),
            }],
        };
        let parsed = ExportTable::from_csv(&table.to_csv().unwrap()).unwrap();
        assert_eq!(parsed, table);
    }

    #[test]
    fn foreign_header_is_rejected() {
        let err = ExportTable::from_csv(b"when,who,what\n2024-04-01,alice,Present\n").unwrap_err();
        assert!(matches!(err, ReportError::UnexpectedHeader(_)));
    }
}
