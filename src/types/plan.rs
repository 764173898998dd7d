use super::requirement::Requirement;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default visit length for places that do not state one, in minutes
pub const DEFAULT_VISIT_MINUTES: u32 = 120;

/// A recommended stop within a day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub address: String,
    pub category: String,
    pub rating: Option<f64>,
    pub description: String,
    /// Suggested time on site, in minutes
    pub estimated_duration: u32,
    pub reasons: Vec<String>,
}

impl Place {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            category: "business".to_string(),
            rating: None,
            description: String::new(),
            estimated_duration: DEFAULT_VISIT_MINUTES,
            reasons: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_rating(mut self, rating: Option<f64>) -> Self {
        self.rating = rating;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.estimated_duration = minutes;
        self
    }

    pub fn with_reasons(mut self, reasons: Vec<String>) -> Self {
        self.reasons = reasons;
        self
    }

    /// Placeholder stop used when a day would otherwise have no content
    pub fn exploration(destination: &str) -> Self {
        Place::new(
            format!("{} city center", destination),
            format!("{} downtown", destination),
        )
        .with_category("city exploration")
        .with_description(format!("Explore the core business area of {}", destination))
        .with_duration(180)
        .with_reasons(vec![
            "Get familiar with the local business environment".to_string(),
            "Convenient transport links".to_string(),
        ])
    }

    /// The string handed to the maps provider for this stop
    pub fn lookup_key(&self) -> &str {
        if self.address.trim().is_empty() {
            &self.name
        } else {
            &self.address
        }
    }

    /// Name and address together, for telling apart places that share an address
    pub fn qualified_label(&self) -> String {
        let name = self.name.trim();
        let address = self.address.trim();
        if address.is_empty() || name.to_lowercase().contains(&address.to_lowercase()) {
            name.to_string()
        } else if name.is_empty() {
            address.to_string()
        } else {
            format!("{}, {}", name, address)
        }
    }
}

/// One day of a plan.
///
/// `total_estimated_minutes` always equals the sum of the places' durations; every
/// mutating method recomputes it together with the route summary, and so does
/// deserialization, whatever totals the input carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredDayPlan")]
pub struct DayPlan {
    pub day: u32,
    pub theme: String,
    places: Vec<Place>,
    route_summary: String,
    total_estimated_minutes: u32,
    pub notes: Vec<String>,
}

/// Wire form of a [`DayPlan`]; derived fields are ignored on input
#[derive(Deserialize)]
struct StoredDayPlan {
    day: u32,
    theme: String,
    #[serde(default)]
    places: Vec<Place>,
    #[serde(default)]
    notes: Vec<String>,
}

impl From<StoredDayPlan> for DayPlan {
    fn from(stored: StoredDayPlan) -> Self {
        DayPlan::new(stored.day, stored.theme, stored.places).with_notes(stored.notes)
    }
}

impl DayPlan {
    pub fn new(day: u32, theme: impl Into<String>, places: Vec<Place>) -> Self {
        let mut plan = Self {
            day,
            theme: theme.into(),
            places,
            route_summary: String::new(),
            total_estimated_minutes: 0,
            notes: Vec::new(),
        };
        plan.recompute();
        plan
    }

    pub fn with_notes(mut self, notes: Vec<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn route_summary(&self) -> &str {
        &self.route_summary
    }

    pub fn total_estimated_minutes(&self) -> u32 {
        self.total_estimated_minutes
    }

    pub fn push_place(&mut self, place: Place) {
        self.places.push(place);
        self.recompute();
    }

    /// Remove every place with the given name; returns how many were removed
    pub fn remove_place(&mut self, name: &str) -> usize {
        let before = self.places.len();
        self.places.retain(|p| p.name != name);
        let removed = before - self.places.len();
        self.recompute();
        removed
    }

    pub fn replace_places(&mut self, places: Vec<Place>) {
        self.places = places;
        self.recompute();
    }

    pub fn set_theme(&mut self, theme: impl Into<String>) {
        self.theme = theme.into();
        self.recompute();
    }

    fn recompute(&mut self) {
        self.total_estimated_minutes = self.places.iter().map(|p| p.estimated_duration).sum();
        self.route_summary = if self.places.is_empty() {
            "No stops planned".to_string()
        } else {
            let names: Vec<&str> = self.places.iter().map(|p| p.name.as_str()).collect();
            format!("{} stops: {}", self.places.len(), names.join(" → "))
        };
    }
}

/// A complete multi-day plan. Versions are never edited in place; see [`Plan::next_version`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub title: String,
    pub requirement: Requirement,
    pub days: Vec<DayPlan>,
    pub overall_summary: String,
    pub total_estimated_cost: Option<String>,
    pub important_notes: Vec<String>,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Plan {
    pub fn new(requirement: Requirement, days: Vec<DayPlan>) -> Self {
        let now = Utc::now();
        let title = format!(
            "{} {}-day business itinerary",
            requirement.destination(),
            requirement.duration_days()
        );
        let mut plan = Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            total_estimated_cost: requirement.budget().map(str::to_string),
            requirement,
            days,
            overall_summary: String::new(),
            important_notes: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        };
        plan.refresh_summary();
        plan
    }

    /// Deep copy with the version bumped, ready to be modified
    pub fn next_version(&self) -> Plan {
        let mut next = self.clone();
        next.version += 1;
        next.updated_at = Utc::now();
        next
    }

    pub fn total_places(&self) -> usize {
        self.days.iter().map(|d| d.places().len()).sum()
    }

    pub fn day_mut(&mut self, day: u32) -> Option<&mut DayPlan> {
        self.days.iter_mut().find(|d| d.day == day)
    }

    pub fn refresh_summary(&mut self) {
        let prefix = if self.version > 1 { "Updated " } else { "" };
        self.overall_summary = format!(
            "{}{}-day itinerary for {} ({} travelers) covering {} stops",
            prefix,
            self.requirement.duration_days(),
            self.requirement.destination(),
            self.requirement.group_size(),
            self.total_places()
        );
    }
}
