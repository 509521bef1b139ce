//! Listener context for prompt enhancement.
//!
//! The frontend may send where and when the listener is. That becomes a short summary
//! ("Friday evening in autumn, Lisbon, Portugal (Europe/Lisbon)") plus a few mood hints
//! appended to the user's prompt before it goes to the model.
//!
//! Enrichment never fails a request: [`enrich`] logs the problem and falls back to the
//! prompt exactly as the user wrote it.

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationContext {
    #[serde(default)]
    pub location: Option<LocationInput>,
    /// IANA zone name as reported by the browser, e.g. "Europe/Lisbon"
    #[serde(default)]
    pub timezone: Option<String>,
    /// Listener's local time, RFC 3339 (offset optional)
    #[serde(default)]
    pub local_time: Option<String>,
}

/// The browser either sends a free-form place name or a structured location.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum LocationInput {
    Name(String),
    Detailed(Location),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Location {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=20 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Night => "night",
        }
    }

    fn mood_hint(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "bright tones with gently building energy",
            TimeOfDay::Afternoon => "a steady, upbeat groove",
            TimeOfDay::Evening => "warm, relaxed grooves",
            TimeOfDay::Night => "deep, atmospheric, lower-energy textures",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Meteorological seasons; the southern hemisphere is shifted by half a year.
    pub fn from_month(month: u32, southern_hemisphere: bool) -> Self {
        let northern = match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        };
        if !southern_hemisphere {
            return northern;
        }
        match northern {
            Season::Spring => Season::Autumn,
            Season::Summer => Season::Winter,
            Season::Autumn => Season::Spring,
            Season::Winter => Season::Summer,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
            Season::Winter => "winter",
        }
    }

    fn mood_hint(&self) -> &'static str {
        match self {
            Season::Spring => "fresh, light melodies",
            Season::Summer => "sunny, energetic rhythms",
            Season::Autumn => "mellow, earthy warmth",
            Season::Winter => "cozy, introspective moods",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ContextError {
    #[error("local time '{0}' is not a valid RFC 3339 timestamp")]
    InvalidLocalTime(String),

    #[error("timezone '{0}' is not a known IANA zone")]
    InvalidTimezone(String),

    #[error("coordinates out of range (latitude {latitude}, longitude {longitude})")]
    InvalidCoordinates { latitude: f64, longitude: f64 },
}

/// What could be derived from the request context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GatheredContext {
    pub weekday: Option<Weekday>,
    pub time_of_day: Option<TimeOfDay>,
    pub season: Option<Season>,
    pub place: Option<String>,
    pub timezone: Option<String>,
}

impl GatheredContext {
    pub fn is_empty(&self) -> bool {
        self.time_of_day.is_none() && self.place.is_none() && self.timezone.is_none()
    }

    /// Human-readable one-liner, `None` when nothing was gathered.
    pub fn summary(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let mut parts: Vec<String> = Vec::new();
        let mut when = String::new();
        if let (Some(day), Some(tod)) = (self.weekday, self.time_of_day) {
            when = format!("{} {}", weekday_name(day), tod.as_str());
        }
        if let Some(season) = self.season {
            if when.is_empty() {
                when = season.as_str().to_string();
            } else {
                when = format!("{} in {}", when, season.as_str());
            }
        }
        if !when.is_empty() {
            parts.push(when);
        }
        if let Some(place) = &self.place {
            parts.push(place.clone());
        }

        let mut summary = parts.join(", ");
        if let Some(tz) = &self.timezone {
            if summary.is_empty() {
                summary = tz.clone();
            } else {
                summary = format!("{} ({})", summary, tz);
            }
        }
        Some(summary)
    }

    pub fn mood_hints(&self) -> Vec<&'static str> {
        let mut hints = Vec::new();
        if let Some(tod) = self.time_of_day {
            hints.push(tod.mood_hint());
        }
        if let Some(season) = self.season {
            hints.push(season.mood_hint());
        }
        match (self.weekday, self.time_of_day) {
            (Some(Weekday::Fri), Some(TimeOfDay::Evening | TimeOfDay::Night))
            | (Some(Weekday::Sat), Some(TimeOfDay::Evening | TimeOfDay::Night)) => {
                hints.push("a party-ready weekend energy")
            }
            (Some(Weekday::Sat | Weekday::Sun), _) => hints.push("a laid-back weekend feel"),
            _ => {}
        }
        hints
    }
}

/// Result of enrichment, whether or not it succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    /// Prompt to send to the model
    pub prompt: String,
    pub summary: Option<String>,
    pub enhanced: bool,
    /// Why enrichment was skipped, if it failed
    pub error: Option<String>,
}

impl Enrichment {
    fn unchanged(prompt: &str, error: Option<String>) -> Self {
        Self {
            prompt: prompt.to_string(),
            summary: None,
            enhanced: false,
            error,
        }
    }
}

pub fn gather(context: &GenerationContext) -> Result<GatheredContext, ContextError> {
    let mut gathered = GatheredContext::default();
    let mut southern = false;

    if let Some(location) = &context.location {
        match location {
            LocationInput::Name(name) => {
                let name = name.trim();
                if !name.is_empty() {
                    gathered.place = Some(name.to_string());
                }
            }
            LocationInput::Detailed(loc) => {
                let latitude = loc.latitude.unwrap_or_default();
                let longitude = loc.longitude.unwrap_or_default();
                if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
                    return Err(ContextError::InvalidCoordinates { latitude, longitude });
                }
                southern = latitude < 0.0;
                let label: Vec<&str> = [&loc.city, &loc.region, &loc.country]
                    .into_iter()
                    .filter_map(|part| part.as_deref())
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .collect();
                if !label.is_empty() {
                    gathered.place = Some(label.join(", "));
                }
            }
        }
    }

    if let Some(tz) = context.timezone.as_deref().map(str::trim).filter(|tz| !tz.is_empty()) {
        let zone: Tz = tz
            .parse()
            .map_err(|_| ContextError::InvalidTimezone(tz.to_string()))?;
        gathered.timezone = Some(zone.name().to_string());
    }

    if let Some(raw) = context.local_time.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let local = parse_local_time(raw)?;
        gathered.weekday = Some(local.weekday());
        gathered.time_of_day = Some(TimeOfDay::from_hour(local.hour()));
        gathered.season = Some(Season::from_month(local.month(), southern));
    }

    Ok(gathered)
}

pub fn enhance_prompt(prompt: &str, gathered: &GatheredContext) -> String {
    let Some(summary) = gathered.summary() else {
        return prompt.to_string();
    };

    let mut enhanced = format!("{}\n\nListener context: {}.", prompt, summary);
    let hints = gathered.mood_hints();
    if !hints.is_empty() {
        enhanced.push_str(&format!(
            "\nIf it fits the request, lean towards {}.",
            hints.join("; ")
        ));
    }
    enhanced
}

/// Enrich `prompt` with `context`, falling back to the original prompt on any error.
pub fn enrich(prompt: &str, context: Option<&GenerationContext>) -> Enrichment {
    let Some(context) = context else {
        return Enrichment::unchanged(prompt, None);
    };

    match gather(context) {
        Ok(gathered) if gathered.is_empty() => Enrichment::unchanged(prompt, None),
        Ok(gathered) => {
            let summary = gathered.summary();
            debug!(summary = ?summary, "Prompt enriched with listener context");
            Enrichment {
                prompt: enhance_prompt(prompt, &gathered),
                summary,
                enhanced: true,
                error: None,
            }
        }
        Err(err) => {
            warn!(error = %err, "Context gathering failed, using original prompt");
            Enrichment::unchanged(prompt, Some(err.to_string()))
        }
    }
}

/// The wall-clock fields are what matter; any offset is simply dropped.
fn parse_local_time(raw: &str) -> Result<NaiveDateTime, ContextError> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Ok(with_offset.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive);
        }
    }
    Err(ContextError::InvalidLocalTime(raw.to_string()))
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lisbon_friday_evening() -> GenerationContext {
        GenerationContext {
            location: Some(LocationInput::Detailed(Location {
                city: Some("Lisbon".to_string()),
                country: Some("Portugal".to_string()),
                latitude: Some(38.72),
                longitude: Some(-9.14),
                ..Default::default()
            })),
            timezone: Some("Europe/Lisbon".to_string()),
            local_time: Some("2025-10-17T19:30:00+01:00".to_string()),
        }
    }

    #[test]
    fn test_time_of_day_boundaries() {
        assert_eq!(TimeOfDay::from_hour(4), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(5), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(12), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(17), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(21), TimeOfDay::Night);
    }

    #[test]
    fn test_season_flips_south_of_equator() {
        assert_eq!(Season::from_month(7, false), Season::Summer);
        assert_eq!(Season::from_month(7, true), Season::Winter);
        assert_eq!(Season::from_month(12, false), Season::Winter);
        assert_eq!(Season::from_month(12, true), Season::Summer);
    }

    #[test]
    fn test_summary_and_prompt() {
        let enrichment = enrich("chill house beat", Some(&lisbon_friday_evening()));
        assert!(enrichment.enhanced);
        assert_eq!(
            enrichment.summary.as_deref(),
            Some("Friday evening in autumn, Lisbon, Portugal (Europe/Lisbon)")
        );
        assert!(enrichment.prompt.starts_with("chill house beat\n\nListener context:"));
        assert!(enrichment.prompt.contains("party-ready"));
    }

    #[test]
    fn test_plain_location_name() {
        let context: GenerationContext =
            serde_json::from_value(serde_json::json!({ "location": "Berlin" })).unwrap();
        let gathered = gather(&context).unwrap();
        assert_eq!(gathered.summary().as_deref(), Some("Berlin"));
        assert!(gathered.mood_hints().is_empty());
    }

    #[test]
    fn test_invalid_local_time_falls_back() {
        let context = GenerationContext {
            local_time: Some("yesterday-ish".to_string()),
            ..lisbon_friday_evening()
        };
        let enrichment = enrich("techno", Some(&context));
        assert!(!enrichment.enhanced);
        assert_eq!(enrichment.prompt, "techno");
        assert!(enrichment.error.unwrap().contains("yesterday-ish"));
    }

    #[test]
    fn test_invalid_coordinates() {
        let context = GenerationContext {
            location: Some(LocationInput::Detailed(Location {
                latitude: Some(123.0),
                longitude: Some(0.0),
                ..Default::default()
            })),
            ..Default::default()
        };
        assert!(matches!(gather(&context), Err(ContextError::InvalidCoordinates { .. })));
    }

    #[test]
    fn test_invalid_timezone() {
        for tz in ["Europe/Lisbon; DROP", "Foo/Bar", "Mars/Olympus_Mons"] {
            let context = GenerationContext {
                timezone: Some(tz.to_string()),
                ..Default::default()
            };
            assert!(matches!(gather(&context), Err(ContextError::InvalidTimezone(_))));
        }
    }

    #[test]
    fn test_known_timezones_accepted() {
        for tz in ["Europe/Lisbon", "America/Argentina/Buenos_Aires", "UTC"] {
            let context = GenerationContext {
                timezone: Some(format!(" {} ", tz)),
                ..Default::default()
            };
            let gathered = gather(&context).unwrap();
            assert_eq!(gathered.timezone.as_deref(), Some(tz));
        }
    }

    #[test]
    fn test_empty_context_is_not_enhanced() {
        let enrichment = enrich("ambient", Some(&GenerationContext::default()));
        assert!(!enrichment.enhanced);
        assert!(enrichment.error.is_none());
        assert_eq!(enrichment.prompt, "ambient");
    }

    #[test]
    fn test_naive_local_time() {
        let context = GenerationContext {
            local_time: Some("2025-01-05T08:15".to_string()),
            ..Default::default()
        };
        let gathered = gather(&context).unwrap();
        assert_eq!(gathered.time_of_day, Some(TimeOfDay::Morning));
        assert_eq!(gathered.weekday, Some(Weekday::Sun));
        assert_eq!(gathered.season, Some(Season::Winter));
        assert_eq!(gathered.summary().as_deref(), Some("Sunday morning in winter"));
    }
}
