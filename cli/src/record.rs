use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::PLAYER_BASE_STATS;
use crate::error::{Result, ScrapeError};
use crate::normalize::Taxonomy;

#[derive(Deserialize)]
struct WeaponUsage {
    #[serde(rename = "type")]
    category: String,
    kills: f64,
    #[serde(rename = "killsPerMinute")]
    kills_per_minute: f64,
    /// Percentage of kills that were headshots.
    headshots: f64,
}

#[derive(Deserialize)]
struct VehicleUsage {
    #[serde(rename = "type")]
    category: String,
    kills: f64,
    destroyed: f64,
    /// Seconds.
    #[serde(rename = "timeIn")]
    time_in: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct WeaponTotals {
    kills: f64,
    time: f64,
    head_shots: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct VehicleTotals {
    kills: f64,
    time: f64,
    destroyed: f64,
}

/// One flattened dataset row: base attributes followed by every weapon and
/// vehicle category's metrics, always in the same column order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRecord {
    fields: Vec<(String, Value)>,
}

impl PlayerRecord {
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(column, _)| column.as_str())
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, value)| value)
    }

    pub fn user_name(&self) -> String {
        self.get("userName").map(cell_text).unwrap_or_default()
    }

    /// The stats API id, rendered the way it appears in the dataset file.
    pub fn id(&self) -> String {
        self.get("id").map(cell_text).unwrap_or_default()
    }

    pub fn header(&self) -> Vec<String> {
        self.columns().map(str::to_string).collect()
    }

    pub fn to_row(&self) -> Vec<String> {
        self.fields.iter().map(|(_, value)| cell_text(value)).collect()
    }
}

/// Text form of a cell as written to the dataset.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Integral values are written without a fractional part.
fn number(x: f64) -> Value {
    if x.fract() == 0.0 && x.abs() < 9_007_199_254_740_992.0 {
        Value::from(x as i64)
    } else {
        serde_json::Number::from_f64(x)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

// Half-to-even, matching the rounding the existing datasets were built with
fn round0(x: f64) -> f64 {
    x.round_ties_even()
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round_ties_even() / 100.0
}

#[derive(Debug, Clone)]
pub struct RecordBuilder {
    weapons: Taxonomy,
    vehicles: Taxonomy,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new(Taxonomy::weapons(), Taxonomy::vehicles())
    }
}

impl RecordBuilder {
    pub fn new(weapons: Taxonomy, vehicles: Taxonomy) -> Self {
        Self { weapons, vehicles }
    }

    /// Flattens one player's stats payload. Any missing attribute, unknown
    /// category or non-numeric metric fails the whole record.
    pub fn build_record(&self, name: &str, payload: &Value) -> Result<PlayerRecord> {
        let object = payload
            .as_object()
            .ok_or_else(|| ScrapeError::malformed(format!("stats for {name} are not an object")))?;

        let mut fields = Vec::with_capacity(
            PLAYER_BASE_STATS.len()
                + self.weapons.labels().len() * 5
                + self.vehicles.labels().len() * 4,
        );

        for key in PLAYER_BASE_STATS {
            let value = object
                .get(key)
                .ok_or_else(|| ScrapeError::malformed(format!("stats for {name} lack {key:?}")))?;
            fields.push((key.to_string(), value.clone()));
        }

        // id is the dedup key, so it has to be present and non-blank
        match object.get("id") {
            Some(Value::Null) | None => {
                return Err(ScrapeError::malformed(format!("stats for {name} have a null id")))
            }
            Some(id) if cell_text(id).trim().is_empty() => {
                return Err(ScrapeError::malformed(format!("stats for {name} have an empty id")))
            }
            Some(_) => {}
        }

        let weapons = self.weapon_totals(name, object)?;
        for (category, totals) in self.weapons.labels().iter().zip(&weapons) {
            let kills_per_minute = if totals.time != 0.0 {
                round2(totals.kills / totals.time * 60.0)
            } else {
                0.0
            };
            let head_shot_kill_rate = if totals.kills != 0.0 {
                round2(totals.head_shots / totals.kills)
            } else {
                0.0
            };

            fields.push((format!("{category} kills"), number(totals.kills)));
            fields.push((format!("{category} time"), number(round0(totals.time))));
            fields.push((format!("{category} headShots"), number(totals.head_shots)));
            fields.push((format!("{category} killsPerMinute"), number(kills_per_minute)));
            fields.push((format!("{category} headShotKillRate"), number(head_shot_kill_rate)));
        }

        let vehicles = self.vehicle_totals(name, object)?;
        for (category, totals) in self.vehicles.labels().iter().zip(&vehicles) {
            let kills_per_minute = if totals.time != 0.0 {
                round2(totals.kills / totals.time * 60.0)
            } else {
                0.0
            };

            fields.push((format!("{category} kills"), number(totals.kills)));
            fields.push((format!("{category} time"), number(totals.time)));
            fields.push((format!("{category} destroyed"), number(totals.destroyed)));
            fields.push((format!("{category} killsPerMinute"), number(kills_per_minute)));
        }

        Ok(PlayerRecord { fields })
    }

    fn weapon_totals(&self, name: &str, object: &Map<String, Value>) -> Result<Vec<WeaponTotals>> {
        let mut totals = vec![WeaponTotals::default(); self.weapons.labels().len()];

        for (i, entry) in usage_entries(name, object, "weapons")?.iter().enumerate() {
            let usage = WeaponUsage::deserialize(entry).map_err(|e| {
                ScrapeError::malformed(format!("{name}'s weapons[{i}]: {e}"))
            })?;
            let slot = &mut totals[self.weapons.index_of(&usage.category)?];

            slot.kills += usage.kills;
            if usage.kills_per_minute != 0.0 {
                slot.time += usage.kills / usage.kills_per_minute * 60.0;
            }
            slot.head_shots += round0(usage.headshots / 100.0 * usage.kills);
        }

        Ok(totals)
    }

    fn vehicle_totals(&self, name: &str, object: &Map<String, Value>) -> Result<Vec<VehicleTotals>> {
        let mut totals = vec![VehicleTotals::default(); self.vehicles.labels().len()];

        for (i, entry) in usage_entries(name, object, "vehicles")?.iter().enumerate() {
            let usage = VehicleUsage::deserialize(entry).map_err(|e| {
                ScrapeError::malformed(format!("{name}'s vehicles[{i}]: {e}"))
            })?;
            let slot = &mut totals[self.vehicles.index_of(&usage.category)?];

            slot.kills += usage.kills;
            slot.destroyed += usage.destroyed;
            slot.time += usage.time_in;
        }

        Ok(totals)
    }
}

fn usage_entries<'a>(name: &str, object: &'a Map<String, Value>, key: &str) -> Result<&'a Vec<Value>> {
    object
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| ScrapeError::malformed(format!("stats for {name} lack a {key:?} list")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn payload(weapons: Value, vehicles: Value) -> Value {
        let mut base = Map::new();
        for (i, key) in PLAYER_BASE_STATS.iter().enumerate() {
            base.insert(key.to_string(), json!(i));
        }
        base.insert("userName".into(), json!("Alice"));
        base.insert("id".into(), json!(123456789));
        base.insert("killDeath".into(), json!(1.25));
        base.insert("weapons".into(), weapons);
        base.insert("vehicles".into(), vehicles);
        Value::Object(base)
    }

    fn build(weapons: Value, vehicles: Value) -> Result<PlayerRecord> {
        RecordBuilder::default().build_record("Alice", &payload(weapons, vehicles))
    }

    #[test]
    fn weapon_rates_come_from_combined_totals() {
        let record = build(
            json!([
                {"type": "DMRs", "kills": 10, "killsPerMinute": 5, "headshots": 50},
                {"type": "DMRs", "kills": 20, "killsPerMinute": 10, "headshots": 25}
            ]),
            json!([]),
        )
        .unwrap();

        assert_eq!(record.get("DMRs kills"), Some(&json!(30)));
        assert_eq!(record.get("DMRs time"), Some(&json!(240)));
        assert_eq!(record.get("DMRs killsPerMinute"), Some(&json!(7.5)));
        assert_eq!(record.get("DMRs headShots"), Some(&json!(10)));
        assert_eq!(record.get("DMRs headShotKillRate"), Some(&json!(0.33)));
    }

    #[test]
    fn zero_rate_weapon_adds_no_time() {
        let record = build(
            json!([{"type": "Handguns", "kills": 4, "killsPerMinute": 0, "headshots": 0}]),
            json!([]),
        )
        .unwrap();

        assert_eq!(record.get("Handguns kills"), Some(&json!(4)));
        assert_eq!(record.get("Handguns time"), Some(&json!(0)));
        assert_eq!(record.get("Handguns killsPerMinute"), Some(&json!(0)));
    }

    #[test]
    fn headshot_count_rounds_half_to_even() {
        // 50% of 5 kills is 2.5 headshots
        let record = build(
            json!([{"type": "PDWs", "kills": 5, "killsPerMinute": 1, "headshots": 50}]),
            json!([]),
        )
        .unwrap();

        assert_eq!(record.get("PDWs headShots"), Some(&json!(2)));
        assert_eq!(record.get("PDWs headShotKillRate"), Some(&json!(0.4)));
    }

    #[test]
    fn vehicles_aggregate_after_remap() {
        let record = build(
            json!([]),
            json!([
                {"type": "MBT T90", "kills": 30, "destroyed": 2, "timeIn": 600},
                {"type": "MBT M1 Abrams", "kills": 10, "destroyed": 1, "timeIn": 600},
                {"type": "Stationary ", "kills": 3, "destroyed": 0, "timeIn": 0}
            ]),
        )
        .unwrap();

        assert_eq!(record.get("Main Battle Tanks kills"), Some(&json!(40)));
        assert_eq!(record.get("Main Battle Tanks time"), Some(&json!(1200)));
        assert_eq!(record.get("Main Battle Tanks destroyed"), Some(&json!(3)));
        assert_eq!(record.get("Main Battle Tanks killsPerMinute"), Some(&json!(2)));
        assert_eq!(record.get("Stationary kills"), Some(&json!(3)));
        assert_eq!(record.get("Stationary killsPerMinute"), Some(&json!(0)));
    }

    #[test]
    fn schema_is_uniform_without_usage() {
        let sparse = build(json!([]), json!([])).unwrap();
        let busy = build(
            json!([{"type": "LMGs", "kills": 1, "killsPerMinute": 1, "headshots": 0}]),
            json!([{"type": "Air", "kills": 1, "destroyed": 0, "timeIn": 60}]),
        )
        .unwrap();

        assert_eq!(sparse.header(), busy.header());
        assert_eq!(sparse.header().len(), 24 + 13 * 5 + 13 * 4);
        assert_eq!(sparse.header()[0], "userName");
        assert_eq!(sparse.header()[24], "LMGs kills");
        assert_eq!(sparse.get("Air kills"), Some(&json!(0)));
    }

    #[test]
    fn identical_payloads_give_identical_rows() {
        let weapons = json!([{"type": "Carbines", "kills": 7, "killsPerMinute": 0.7, "headshots": 13.5}]);
        let vehicles = json!([{"type": "Transport", "kills": 2, "destroyed": 1, "timeIn": 45}]);

        let a = build(weapons.clone(), vehicles.clone()).unwrap();
        let b = build(weapons, vehicles).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.to_row(), b.to_row());
    }

    #[test]
    fn base_attributes_are_copied_verbatim() {
        let record = build(json!([]), json!([])).unwrap();
        assert_eq!(record.user_name(), "Alice");
        assert_eq!(record.id(), "123456789");
        assert_eq!(record.get("killDeath"), Some(&json!(1.25)));
    }

    #[test]
    fn missing_base_attribute_fails() {
        let mut p = payload(json!([]), json!([]));
        p.as_object_mut().unwrap().remove("skill");
        let err = RecordBuilder::default().build_record("Alice", &p).unwrap_err();
        assert!(matches!(err, ScrapeError::MalformedResponse(_)));
    }

    #[test]
    fn null_or_blank_id_fails() {
        for id in [json!(null), json!(""), json!("  ")] {
            let mut p = payload(json!([]), json!([]));
            p.as_object_mut().unwrap().insert("id".into(), id);
            let err = RecordBuilder::default().build_record("Alice", &p).unwrap_err();
            assert!(matches!(err, ScrapeError::MalformedResponse(_)));
        }
    }

    #[test]
    fn unknown_vehicle_fails_whole_record() {
        let err = build(
            json!([]),
            json!([{"type": "Hovercraft", "kills": 1, "destroyed": 0, "timeIn": 1}]),
        )
        .unwrap_err();
        assert!(matches!(err, ScrapeError::UnrecognizedCategory { .. }));
    }

    #[test]
    fn unknown_weapon_fails_whole_record() {
        let err = build(
            json!([{"type": "Crossbows", "kills": 1, "killsPerMinute": 1, "headshots": 0}]),
            json!([]),
        )
        .unwrap_err();
        assert!(matches!(err, ScrapeError::UnrecognizedCategory { .. }));
    }

    #[test]
    fn non_numeric_kills_fail() {
        let err = build(
            json!([{"type": "LMGs", "kills": "many", "killsPerMinute": 1, "headshots": 0}]),
            json!([]),
        )
        .unwrap_err();
        assert!(matches!(err, ScrapeError::MalformedResponse(_)));
    }

    #[test]
    fn missing_usage_list_fails() {
        let mut p = payload(json!([]), json!([]));
        p.as_object_mut().unwrap().remove("vehicles");
        assert!(RecordBuilder::default().build_record("Alice", &p).is_err());
    }

    #[test]
    fn cells_render_like_the_dataset() {
        assert_eq!(cell_text(&json!(null)), "");
        assert_eq!(cell_text(&json!(true)), "True");
        assert_eq!(cell_text(&json!("x")), "x");
        assert_eq!(cell_text(&json!(7.5)), "7.5");
        assert_eq!(cell_text(&number(30.0)), "30");
    }
}
