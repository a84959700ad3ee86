use std::fmt;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::Error;

/// Lowest setpoint the IT500 accepts, in Celsius.
pub const MIN_TEMP: f64 = 5.0;
/// Highest setpoint the IT500 accepts, in Celsius.
pub const MAX_TEMP: f64 = 30.0;

/// The portal throttles clients that poll faster than this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(120);

/// One of the two heating circuits on an IT500.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Zone {
    #[default]
    Z1,
    Z2,
}

impl Zone {
    pub fn number(&self) -> u8 {
        match self {
            Zone::Z1 => 1,
            Zone::Z2 => 2,
        }
    }

    /// Field-name suffix used by current portal schemas.
    pub fn suffix(&self) -> &'static str {
        match self {
            Zone::Z1 => "Z1",
            Zone::Z2 => "Z2",
        }
    }
}

impl TryFrom<u8> for Zone {
    type Error = Error;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(Zone::Z1),
            2 => Ok(Zone::Z2),
            other => Err(Error::InvalidZone(other)),
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Portal login and target device. Fixed for the lifetime of a client.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
    device_id: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            device_id: device_id.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("device_id", &self.device_id)
            .finish()
    }
}

/// A telemetry field as found in the payload: cast to the wanted type, or
/// kept as the raw JSON value when the cast failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Resolved<T> {
    Cast(T),
    Raw(Value),
}

impl<T> Resolved<T> {
    pub fn cast(&self) -> Option<&T> {
        match self {
            Resolved::Cast(v) => Some(v),
            Resolved::Raw(_) => None,
        }
    }
}

/// A temperature in Celsius, or whatever the portal sent if it was not a number.
pub type Reading = Resolved<f64>;

impl Reading {
    pub fn celsius(&self) -> Option<f64> {
        self.cast().copied()
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Cast(c) => write!(f, "{c:.1}\u{00b0}C"),
            Resolved::Raw(v) => write!(f, "{v}"),
        }
    }
}

/// ON means the zone heats to its setpoint (HEAT); OFF means it is switched off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum OperationMode {
    On,
    #[default]
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HvacAction {
    Off,
    Heating,
    Idle,
}

/// Last known state of one zone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ZoneState {
    pub current_temperature: Option<Reading>,
    pub target_temperature: Option<Reading>,
    pub frost: Option<Reading>,
    pub heating_active: bool,
    pub operation_mode: OperationMode,
}

impl ZoneState {
    pub fn hvac_action(&self) -> HvacAction {
        match (self.operation_mode, self.heating_active) {
            (OperationMode::Off, _) => HvacAction::Off,
            (OperationMode::On, true) => HvacAction::Heating,
            (OperationMode::On, false) => HvacAction::Idle,
        }
    }
}

/// Emitted when a published snapshot differs from the previous one.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    TemperatureChanged { zone: Zone, temp: Option<Reading> },
    TargetChanged { zone: Zone, temp: Option<Reading> },
    FrostChanged { zone: Zone, temp: Option<Reading> },
    HeatingChanged { zone: Zone, active: bool },
    ModeChanged { zone: Zone, mode: OperationMode },
}

pub(crate) fn snapshot_events(zone: Zone, old: &ZoneState, new: &ZoneState) -> Vec<Event> {
    let mut events = Vec::new();
    if old.current_temperature != new.current_temperature {
        events.push(Event::TemperatureChanged {
            zone,
            temp: new.current_temperature.clone(),
        });
    }
    if old.target_temperature != new.target_temperature {
        events.push(Event::TargetChanged {
            zone,
            temp: new.target_temperature.clone(),
        });
    }
    if old.frost != new.frost {
        events.push(Event::FrostChanged {
            zone,
            temp: new.frost.clone(),
        });
    }
    if old.heating_active != new.heating_active {
        events.push(Event::HeatingChanged {
            zone,
            active: new.heating_active,
        });
    }
    if old.operation_mode != new.operation_mode {
        events.push(Event::ModeChanged {
            zone,
            mode: new.operation_mode,
        });
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn zone_from_u8() {
        assert_eq!(Zone::try_from(1).unwrap(), Zone::Z1);
        assert_eq!(Zone::try_from(2).unwrap(), Zone::Z2);
        assert!(matches!(Zone::try_from(3), Err(Error::InvalidZone(3))));
        assert!(matches!(Zone::try_from(0), Err(Error::InvalidZone(0))));
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials::new("me@example.com", "hunter2", "12345");
        let dbg = format!("{creds:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("12345"));
    }

    #[test]
    fn hvac_action_follows_mode_then_heating() {
        let mut state = ZoneState::default();
        state.heating_active = true;
        assert_eq!(state.hvac_action(), HvacAction::Off);
        state.operation_mode = OperationMode::On;
        assert_eq!(state.hvac_action(), HvacAction::Heating);
        state.heating_active = false;
        assert_eq!(state.hvac_action(), HvacAction::Idle);
    }

    #[test]
    fn reading_celsius_only_for_numbers() {
        assert_eq!(Reading::Cast(20.5).celsius(), Some(20.5));
        assert_eq!(Reading::Raw(json!("--")).celsius(), None);
    }

    #[test]
    fn snapshot_serializes_raw_readings_verbatim() {
        let state = ZoneState {
            current_temperature: Some(Resolved::Cast(19.5)),
            target_temperature: Some(Resolved::Raw(json!("n/a"))),
            ..Default::default()
        };
        let v = serde_json::to_value(&state).unwrap();
        assert_eq!(v["current_temperature"], 19.5);
        assert_eq!(v["target_temperature"], "n/a");
        assert_eq!(v["frost"], Value::Null);
        assert_eq!(v["operation_mode"], "Off");
    }

    #[test]
    fn events_only_for_changed_fields() {
        let old = ZoneState::default();
        let new = ZoneState {
            target_temperature: Some(Resolved::Cast(21.0)),
            operation_mode: OperationMode::On,
            ..Default::default()
        };
        let events = snapshot_events(Zone::Z2, &old, &new);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::TargetChanged { zone: Zone::Z2, .. }));
        assert!(matches!(
            events[1],
            Event::ModeChanged { mode: OperationMode::On, .. }
        ));
        assert!(snapshot_events(Zone::Z1, &new, &new).is_empty());
    }
}
