//! Classification and handling of system interruption alerts.
//!
//! Permission prompts and other system alerts interrupt a test at moments it
//! does not control. [`AlertClassifier`] reads an alert's text and buttons,
//! decides what kind of alert it is from its message, and assigns each
//! button a [`ButtonRole`]. [`AlertHandler`] finds the current alert through
//! a driver and taps the button for a requested role, so a test can say
//! "allow" or "deny" without knowing the exact wording of the dialog.
//!
//! Rules are matched in order; the first rule whose message pattern occurs
//! in the alert text wins. Matching is case-insensitive and treats curly
//! apostrophes as straight ones.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::driver::{glob_match, AutomationDriver, DriverError, Selector};
use crate::element::UIElement;
use crate::geometry::Rect;

/// Element type of system alerts in the hierarchy.
pub const ALERT_TYPE: &str = "Alert";

/// The protected resource a permission prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    Location,
    LocationAlways,
    Notifications,
    Camera,
    Microphone,
    Photos,
    Contacts,
    Calendars,
    Tracking,
}

/// What an alert is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Permission(PermissionKind),
    Generic,
}

impl AlertKind {
    pub fn is_permission(&self) -> bool {
        matches!(self, AlertKind::Permission(_))
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::Permission(p) => write!(f, "{:?} permission", p),
            AlertKind::Generic => f.write_str("generic alert"),
        }
    }
}

/// What pressing a button does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonRole {
    /// Grant a permission.
    Allow,
    /// Grant a permission for this session only.
    AllowOnce,
    /// Refuse a permission.
    Deny,
    /// Confirm a non-permission alert.
    Accept,
    /// Back out of a non-permission alert.
    Cancel,
}

impl fmt::Display for ButtonRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ButtonRole::Allow => "allow",
            ButtonRole::AllowOnce => "allow once",
            ButtonRole::Deny => "deny",
            ButtonRole::Accept => "accept",
            ButtonRole::Cancel => "cancel",
        };
        f.write_str(name)
    }
}

/// Maps alert text to a kind and button labels to roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub kind: AlertKind,
    /// Lowercase substrings; any one occurring in the alert text selects
    /// this rule. An empty list matches every alert.
    pub message_patterns: Vec<String>,
    /// Lowercase label globs per role, tried in order.
    pub buttons: Vec<(ButtonRole, Vec<String>)>,
}

impl AlertRule {
    pub fn new(kind: AlertKind, message_patterns: &[&str], buttons: &[(ButtonRole, &[&str])]) -> Self {
        Self {
            kind,
            message_patterns: message_patterns.iter().map(|p| p.to_string()).collect(),
            buttons: buttons
                .iter()
                .map(|(role, labels)| (*role, labels.iter().map(|l| l.to_string()).collect()))
                .collect(),
        }
    }

    fn matches_text(&self, text: &str) -> bool {
        self.message_patterns.is_empty() || self.message_patterns.iter().any(|p| text.contains(p.as_str()))
    }

    fn role_for(&self, label: &str) -> Option<ButtonRole> {
        self.buttons
            .iter()
            .find(|(_, globs)| globs.iter().any(|g| glob_match(g, label)))
            .map(|(role, _)| *role)
    }
}

const PERMISSION_BUTTONS: &[(ButtonRole, &[&str])] = &[
    (ButtonRole::AllowOnce, &["allow once"]),
    (
        ButtonRole::Allow,
        &["allow", "allow while using app", "allow full access", "allow access to all photos", "ok"],
    ),
    (ButtonRole::Deny, &["don't allow"]),
];

const GENERIC_BUTTONS: &[(ButtonRole, &[&str])] = &[
    (ButtonRole::Accept, &["ok", "continue", "yes", "allow"]),
    (ButtonRole::Cancel, &["cancel", "not now", "no", "close"]),
    (ButtonRole::Deny, &["don't allow"]),
];

/// The built-in rule table.
pub fn default_rules() -> Vec<AlertRule> {
    use PermissionKind::*;

    fn permission(kind: PermissionKind, patterns: &[&str]) -> AlertRule {
        AlertRule::new(AlertKind::Permission(kind), patterns, PERMISSION_BUTTONS)
    }

    vec![
        AlertRule::new(
            AlertKind::Permission(LocationAlways),
            &["even when you are not using", "change to always allow"],
            &[
                (ButtonRole::Allow, &["change to always allow", "allow"]),
                (ButtonRole::Deny, &["keep only while using", "don't allow"]),
            ],
        ),
        permission(Location, &["use your location", "access your location"]),
        permission(Notifications, &["send you notifications"]),
        permission(Camera, &["access the camera"]),
        permission(Microphone, &["access the microphone"]),
        permission(Photos, &["access your photos", "access your photo library", "add to your photos"]),
        permission(Contacts, &["access your contacts"]),
        permission(Calendars, &["access your calendar"]),
        AlertRule::new(
            AlertKind::Permission(Tracking),
            &["track your activity"],
            &[
                (ButtonRole::Allow, &["allow"]),
                (ButtonRole::Deny, &["ask app not to track"]),
            ],
        ),
        AlertRule::new(AlertKind::Generic, &[], GENERIC_BUTTONS),
    ]
}

/// A button of a classified alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertButton {
    pub label: String,
    pub role: Option<ButtonRole>,
    pub frame: Option<Rect>,
}

/// An alert with its kind and button roles resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedAlert {
    pub kind: AlertKind,
    pub title: Option<String>,
    /// Title and body text, one line per text element.
    pub text: String,
    pub buttons: Vec<AlertButton>,
}

impl ClassifiedAlert {
    pub fn button(&self, role: ButtonRole) -> Option<&AlertButton> {
        self.buttons.iter().find(|b| b.role == Some(role))
    }
}

/// Assigns alert kinds and button roles from a rule table.
#[derive(Debug, Clone)]
pub struct AlertClassifier {
    rules: Vec<AlertRule>,
}

impl Default for AlertClassifier {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

impl AlertClassifier {
    /// Adds a rule ahead of the existing ones.
    pub fn prepend_rule(mut self, rule: AlertRule) -> Self {
        self.rules.insert(0, rule);
        self
    }

    pub fn classify(&self, alert: &UIElement) -> ClassifiedAlert {
        let mut lines: Vec<String> = Vec::new();
        if let Some(label) = alert.label.as_deref().filter(|l| !l.is_empty()) {
            lines.push(label.to_string());
        }
        for text in alert.descendants_of_type("StaticText") {
            if let Some(label) = text.label.as_deref().filter(|l| !l.is_empty()) {
                if !lines.iter().any(|l| l == label) {
                    lines.push(label.to_string());
                }
            }
        }
        let text = lines.join("\n");
        let haystack = normalize(&text);

        let rule = self.rules.iter().find(|r| r.matches_text(&haystack));
        let kind = rule.map_or(AlertKind::Generic, |r| r.kind);

        let buttons = alert
            .descendants_of_type("Button")
            .into_iter()
            .filter_map(|b| {
                let label = b.label.clone()?;
                let role = rule.and_then(|r| r.role_for(&normalize(&label)));
                Some(AlertButton {
                    label,
                    role,
                    frame: b.rect(),
                })
            })
            .collect();

        debug!(%kind, "alert classified");
        ClassifiedAlert {
            kind,
            title: lines.first().cloned(),
            text,
            buttons,
        }
    }
}

fn normalize(s: &str) -> String {
    s.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'")
}

/// Errors from [`AlertHandler`].
#[derive(Error, Debug)]
pub enum AlertError {
    /// No alert is on screen.
    #[error("No alert is present")]
    NoAlert,

    /// The alert has no button for the requested role.
    #[error("No '{role}' button on {kind} ({text:?})")]
    ButtonNotFound {
        role: ButtonRole,
        kind: AlertKind,
        text: String,
    },

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Finds the on-screen alert and answers it by role.
pub struct AlertHandler {
    driver: Arc<dyn AutomationDriver>,
    classifier: AlertClassifier,
}

impl AlertHandler {
    pub fn new(driver: Arc<dyn AutomationDriver>) -> Self {
        Self::with_classifier(driver, AlertClassifier::default())
    }

    pub fn with_classifier(driver: Arc<dyn AutomationDriver>, classifier: AlertClassifier) -> Self {
        Self { driver, classifier }
    }

    /// Classifies the first alert on screen, if any.
    pub async fn current(&self) -> Result<Option<ClassifiedAlert>, AlertError> {
        let alert = self.driver.find_element(&Selector::of_type(ALERT_TYPE)).await?;
        Ok(alert.map(|a| self.classifier.classify(&a)))
    }

    /// Taps the button with `role` on the current alert.
    pub async fn respond(&self, role: ButtonRole) -> Result<ClassifiedAlert, AlertError> {
        let alert = self.current().await?.ok_or(AlertError::NoAlert)?;
        let frame = alert
            .button(role)
            .and_then(|b| b.frame)
            .ok_or_else(|| AlertError::ButtonNotFound {
                role,
                kind: alert.kind,
                text: alert.text.clone(),
            })?;
        self.driver.tap_location(frame.center()).await?;
        info!(%role, kind = %alert.kind, "alert answered");
        Ok(alert)
    }

    /// Allows a permission prompt or accepts any other alert.
    pub async fn accept(&self) -> Result<ClassifiedAlert, AlertError> {
        let role = self.positive_role().await?;
        self.respond(role).await
    }

    /// Denies a permission prompt or cancels any other alert.
    pub async fn dismiss(&self) -> Result<ClassifiedAlert, AlertError> {
        let role = self.negative_role().await?;
        self.respond(role).await
    }

    async fn positive_role(&self) -> Result<ButtonRole, AlertError> {
        let alert = self.current().await?.ok_or(AlertError::NoAlert)?;
        Ok(if alert.kind.is_permission() {
            ButtonRole::Allow
        } else {
            ButtonRole::Accept
        })
    }

    async fn negative_role(&self) -> Result<ButtonRole, AlertError> {
        let alert = self.current().await?.ok_or(AlertError::NoAlert)?;
        Ok(if alert.kind.is_permission() || alert.button(ButtonRole::Cancel).is_none() {
            ButtonRole::Deny
        } else {
            ButtonRole::Cancel
        })
    }
}
