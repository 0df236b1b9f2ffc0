//! Role view projector
//!
//! Maps a raw CRM record onto the fixed display shape of a stakeholder role.
//! Projection is pure and total: an attribute that is missing, null or blank
//! takes the field's default.
//!
//! With the `typescript` feature enabled the view types export TypeScript
//! bindings for the dashboard.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::error::RoleError;
use crate::types::Record;

/// Default for text and status fields
pub const NOT_AVAILABLE: &str = "N/A";
/// Default for count and amount fields
pub const ZERO: &str = "0";
/// Default onboarding stage for founders
pub const NOT_STARTED: &str = "Not Started";
/// Default sponsorship status
pub const ACTIVE: &str = "Active";

const CONTACT_FIELDS: &[&str] = &["firstname", "lastname", "email", "phone"];

/// Stakeholder role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub enum Role {
    Founder,
    Mentor,
    Investor,
    Sponsor,
    #[serde(rename = "Event Host")]
    EventHost,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Founder,
        Role::Mentor,
        Role::Investor,
        Role::Sponsor,
        Role::EventHost,
    ];

    /// Association label name operators register for this role
    pub fn label_name(&self) -> &'static str {
        match self {
            Role::Founder => "Founder",
            Role::Mentor => "Mentor",
            Role::Investor => "Investor",
            Role::Sponsor => "Sponsor",
            Role::EventHost => "Event Host",
        }
    }

    /// CRM attribute keys the role's view reads
    pub fn fields(&self) -> Vec<String> {
        let specific: &[&str] = match self {
            Role::Founder => &[
                "application_status",
                "payment_status",
                "onboarding_status",
                "current_cohort",
                "cohort",
                "next_step",
            ],
            Role::Mentor => &[
                "mentor_expertise",
                "mentor_availability",
                "mentor_sessions_completed",
            ],
            Role::Investor => &["investor_focus", "investor_stage", "investor_ticket_size"],
            Role::Sponsor => &[
                "sponsorship_level",
                "contribution_amount",
                "sponsorship_status",
            ],
            Role::EventHost => &[
                "event_host_organization_type",
                "events_hosted",
                "next_event",
            ],
        };

        CONTACT_FIELDS
            .iter()
            .chain(specific)
            .map(|f| f.to_string())
            .collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label_name())
    }
}

impl FromStr for Role {
    type Err = RoleError;

    /// Case-insensitive; accepts the label name, hyphen/underscore/joined
    /// spellings and plural route forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect();
        let singular = normalized.strip_suffix('s').unwrap_or(&normalized);

        match singular {
            "founder" => Ok(Role::Founder),
            "mentor" => Ok(Role::Mentor),
            "investor" => Ok(Role::Investor),
            "sponsor" => Ok(Role::Sponsor),
            "eventhost" => Ok(Role::EventHost),
            _ => Err(RoleError::UnknownRole(s.to_string())),
        }
    }
}

/// Fields every stakeholder card carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct ContactCard {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct FounderView {
    #[serde(flatten)]
    pub contact: ContactCard,
    pub application_status: String,
    pub deposit_status: String,
    pub onboarding_stage: String,
    pub current_cohort: String,
    pub next_steps: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct MentorView {
    #[serde(flatten)]
    pub contact: ContactCard,
    pub expertise: String,
    pub availability: String,
    pub sessions_completed: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct InvestorView {
    #[serde(flatten)]
    pub contact: ContactCard,
    pub investment_focus: String,
    pub investment_stage: String,
    pub ticket_size: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct SponsorView {
    #[serde(flatten)]
    pub contact: ContactCard,
    pub sponsorship_level: String,
    pub contribution_amount: String,
    pub sponsorship_status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct EventHostView {
    #[serde(flatten)]
    pub contact: ContactCard,
    pub organization_type: String,
    pub events_hosted: String,
    pub next_event: String,
}

/// Role-specific projection of a record. Serializes as the bare card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(untagged)]
pub enum RoleView {
    Founder(FounderView),
    Mentor(MentorView),
    Investor(InvestorView),
    Sponsor(SponsorView),
    EventHost(EventHostView),
}

impl RoleView {
    pub fn contact(&self) -> &ContactCard {
        match self {
            RoleView::Founder(v) => &v.contact,
            RoleView::Mentor(v) => &v.contact,
            RoleView::Investor(v) => &v.contact,
            RoleView::Sponsor(v) => &v.contact,
            RoleView::EventHost(v) => &v.contact,
        }
    }

    pub fn id(&self) -> &str {
        &self.contact().id
    }

    pub fn role(&self) -> Role {
        match self {
            RoleView::Founder(_) => Role::Founder,
            RoleView::Mentor(_) => Role::Mentor,
            RoleView::Investor(_) => Role::Investor,
            RoleView::Sponsor(_) => Role::Sponsor,
            RoleView::EventHost(_) => Role::EventHost,
        }
    }
}

/// Project a record into the view for `role`.
pub fn project(record: &Record, role: Role) -> RoleView {
    let field = |key: &str, default: &str| record.text(key).unwrap_or_else(|| default.to_string());
    let contact = contact_card(record);

    match role {
        Role::Founder => RoleView::Founder(FounderView {
            contact,
            application_status: field("application_status", NOT_AVAILABLE),
            deposit_status: field("payment_status", NOT_AVAILABLE),
            onboarding_stage: field("onboarding_status", NOT_STARTED),
            current_cohort: record
                .text("current_cohort")
                .or_else(|| record.text("cohort"))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            next_steps: field("next_step", NOT_AVAILABLE),
        }),
        Role::Mentor => RoleView::Mentor(MentorView {
            contact,
            expertise: field("mentor_expertise", NOT_AVAILABLE),
            availability: field("mentor_availability", NOT_AVAILABLE),
            sessions_completed: field("mentor_sessions_completed", ZERO),
        }),
        Role::Investor => RoleView::Investor(InvestorView {
            contact,
            investment_focus: field("investor_focus", NOT_AVAILABLE),
            investment_stage: field("investor_stage", NOT_AVAILABLE),
            ticket_size: field("investor_ticket_size", NOT_AVAILABLE),
        }),
        Role::Sponsor => RoleView::Sponsor(SponsorView {
            contact,
            sponsorship_level: field("sponsorship_level", NOT_AVAILABLE),
            contribution_amount: field("contribution_amount", ZERO),
            sponsorship_status: field("sponsorship_status", ACTIVE),
        }),
        Role::EventHost => RoleView::EventHost(EventHostView {
            contact,
            organization_type: field("event_host_organization_type", NOT_AVAILABLE),
            events_hosted: field("events_hosted", ZERO),
            next_event: field("next_event", NOT_AVAILABLE),
        }),
    }
}

fn contact_card(record: &Record) -> ContactCard {
    let first = record.text("firstname").unwrap_or_default();
    let last = record.text("lastname").unwrap_or_default();
    let name = format!("{} {}", first, last).trim().to_string();

    ContactCard {
        id: record.id.clone(),
        name: if name.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            name
        },
        email: record
            .text("email")
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        phone: record
            .text("phone")
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_parsing() {
        assert_eq!("Founder".parse::<Role>().unwrap(), Role::Founder);
        assert_eq!("founders".parse::<Role>().unwrap(), Role::Founder);
        assert_eq!(" MENTOR ".parse::<Role>().unwrap(), Role::Mentor);
        for spelling in ["Event Host", "event-host", "event_host", "eventhost", "event-hosts"] {
            assert_eq!(spelling.parse::<Role>().unwrap(), Role::EventHost, "{}", spelling);
        }
        assert!(matches!(
            "janitor".parse::<Role>(),
            Err(RoleError::UnknownRole(name)) if name == "janitor"
        ));
    }

    #[test]
    fn test_role_display_is_label_name() {
        let names: Vec<String> = Role::ALL.iter().map(|r| r.to_string()).collect();
        assert_eq!(names, vec!["Founder", "Mentor", "Investor", "Sponsor", "Event Host"]);
        assert_eq!(serde_json::to_value(Role::EventHost).unwrap(), json!("Event Host"));
    }

    #[test]
    fn test_fields_cover_view_attributes() {
        let fields = Role::Founder.fields();
        assert_eq!(&fields[..4], &["firstname", "lastname", "email", "phone"]);
        assert!(fields.contains(&"cohort".to_string()));
        assert!(fields.contains(&"payment_status".to_string()));
        assert_eq!(Role::EventHost.fields().len(), 7);
    }

    #[test]
    fn test_empty_record_takes_defaults() {
        let empty = Record::new("42");

        let founder = serde_json::to_value(project(&empty, Role::Founder)).unwrap();
        assert_eq!(
            founder,
            json!({
                "id": "42",
                "name": "N/A",
                "email": "N/A",
                "phone": "N/A",
                "applicationStatus": "N/A",
                "depositStatus": "N/A",
                "onboardingStage": "Not Started",
                "currentCohort": "N/A",
                "nextSteps": "N/A",
            })
        );

        let mentor = serde_json::to_value(project(&empty, Role::Mentor)).unwrap();
        assert_eq!(mentor["sessionsCompleted"], "0");
        assert_eq!(mentor["expertise"], "N/A");

        let investor = serde_json::to_value(project(&empty, Role::Investor)).unwrap();
        assert_eq!(investor["ticketSize"], "N/A");

        let sponsor = serde_json::to_value(project(&empty, Role::Sponsor)).unwrap();
        assert_eq!(sponsor["contributionAmount"], "0");
        assert_eq!(sponsor["sponsorshipStatus"], "Active");

        let host = serde_json::to_value(project(&empty, Role::EventHost)).unwrap();
        assert_eq!(host["eventsHosted"], "0");
        assert_eq!(host["organizationType"], "N/A");
    }

    #[test]
    fn test_blank_and_null_values_take_defaults() {
        let record = Record::new("1")
            .with("email", "   ")
            .with_null("phone")
            .with("mentor_sessions_completed", "");

        match project(&record, Role::Mentor) {
            RoleView::Mentor(view) => {
                assert_eq!(view.contact.email, "N/A");
                assert_eq!(view.contact.phone, "N/A");
                assert_eq!(view.sessions_completed, "0");
            }
            other => panic!("unexpected view {:?}", other),
        }
    }

    #[test]
    fn test_name_composition() {
        let both = Record::new("1").with("firstname", "Ada").with("lastname", "Lovelace");
        let first_only = Record::new("2").with("firstname", "Ada");
        let last_only = Record::new("3").with("lastname", "Lovelace");

        assert_eq!(project(&both, Role::Investor).contact().name, "Ada Lovelace");
        assert_eq!(project(&first_only, Role::Investor).contact().name, "Ada");
        assert_eq!(project(&last_only, Role::Investor).contact().name, "Lovelace");
    }

    #[test]
    fn test_cohort_falls_back_to_legacy_attribute() {
        let legacy = Record::new("1").with("cohort", "Spring 2025");
        let both = Record::new("2")
            .with("cohort", "Spring 2025")
            .with("current_cohort", "Fall 2025");

        match (project(&legacy, Role::Founder), project(&both, Role::Founder)) {
            (RoleView::Founder(a), RoleView::Founder(b)) => {
                assert_eq!(a.current_cohort, "Spring 2025");
                assert_eq!(b.current_cohort, "Fall 2025");
            }
            other => panic!("unexpected views {:?}", other),
        }
    }

    #[test]
    fn test_numbers_render_plainly() {
        let record = Record::new("7")
            .with("events_hosted", 12i64)
            .with("next_event", "Demo Day");

        let view = serde_json::to_value(project(&record, Role::EventHost)).unwrap();
        assert_eq!(view["eventsHosted"], "12");
        assert_eq!(view["nextEvent"], "Demo Day");
        assert_eq!(view["id"], "7");
    }

    #[test]
    fn test_view_reports_its_role() {
        let view = project(&Record::new("9"), Role::Sponsor);
        assert_eq!(view.role(), Role::Sponsor);
        assert_eq!(view.id(), "9");
    }
}
