use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{ReadError, WriteError};
use crate::logger::{MessageLogMode, MessageLogger};
use crate::protocol::{
    DEFAULT_BASE_URL, DEFAULT_USER_AGENT, Form, now_ms, set_mode_form, set_temperature_form,
    telemetry_query,
};
use crate::resolver::{FieldKeys, Payload, resolve, to_f64, to_text};
use crate::token::TokenManager;
use crate::transport::Transport;
use crate::types::*;
use crate::{Error, Result};

type EventCallback = Box<dyn Fn(&Event) + Send + Sync>;
type SnapshotCallback = Box<dyn Fn(&ZoneState) + Send + Sync>;

pub struct SalusClientBuilder {
    username: String,
    password: String,
    device_id: String,
    zone: u8,
    base_url: String,
    user_agent: String,
    timeout: Option<Duration>,
    event_callbacks: Vec<EventCallback>,
    snapshot_callbacks: Vec<SnapshotCallback>,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl SalusClientBuilder {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            device_id: device_id.into(),
            zone: 1,
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: None,
            event_callbacks: Vec::new(),
            snapshot_callbacks: Vec::new(),
            log_mode: None,
            log_path: None,
        }
    }

    /// 1 or 2. Anything else fails at `build`.
    pub fn zone(mut self, zone: u8) -> Self {
        self.zone = zone;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn on_event(mut self, f: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        self.event_callbacks.push(Box::new(f));
        self
    }

    pub fn on_snapshot(mut self, f: impl Fn(&ZoneState) + Send + Sync + 'static) -> Self {
        self.snapshot_callbacks.push(Box::new(f));
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<SalusClient> {
        let zone = Zone::try_from(self.zone)?;
        let transport = Transport::new(&self.base_url, &self.user_agent, self.timeout)?;

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(MessageLogger::new(mode, &path)?),
            _ => None,
        };

        Ok(SalusClient {
            transport,
            creds: Credentials::new(self.username, self.password, self.device_id),
            zone,
            keys: FieldKeys::for_zone(zone),
            tokens: TokenManager::default(),
            state: ZoneState::default(),
            hold: None,
            last_reported_target: None,
            event_callbacks: self.event_callbacks,
            snapshot_callbacks: self.snapshot_callbacks,
            logger,
        })
    }
}

/// A setpoint written by us that the portal has not reflected yet.
struct SetpointHold {
    requested: f64,
    /// What the portal reported before the write.
    stale: Option<Reading>,
}

/// One zone of one IT500 device.
///
/// Every operation takes `&mut self`: the caller drives reads and writes one
/// at a time, and each client keeps its own cookie jar and session token.
/// Two zones of the same device use two clients.
pub struct SalusClient {
    transport: Transport,
    creds: Credentials,
    zone: Zone,
    keys: FieldKeys,
    tokens: TokenManager,
    state: ZoneState,
    hold: Option<SetpointHold>,
    last_reported_target: Option<Reading>,
    event_callbacks: Vec<EventCallback>,
    snapshot_callbacks: Vec<SnapshotCallback>,
    logger: Option<MessageLogger>,
}

impl SalusClient {
    pub fn builder(
        username: impl Into<String>,
        password: impl Into<String>,
        device_id: impl Into<String>,
    ) -> SalusClientBuilder {
        SalusClientBuilder::new(username, password, device_id)
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn device_id(&self) -> &str {
        self.creds.device_id()
    }

    pub fn unique_id(&self) -> String {
        format!("salus_it500_{}_{}", self.creds.device_id(), self.zone)
    }

    /// Last published snapshot. Survives failed reads untouched.
    pub fn state(&self) -> &ZoneState {
        &self.state
    }

    pub fn has_session(&self) -> bool {
        self.tokens.has_token()
    }

    /// Drop the session token; the next call logs in again.
    pub fn invalidate_session(&mut self) {
        self.tokens.invalidate();
    }

    // -- State reader --

    /// Fetch telemetry and merge it into the zone snapshot.
    ///
    /// A response that does not decode is taken as an expired token: the
    /// token is replaced and the request retried once. Any failure leaves
    /// the previous snapshot in place.
    pub async fn read(&mut self) -> Result<ZoneState> {
        let payload = match self.fetch_telemetry().await {
            Ok(p) => p,
            Err(e) => {
                warn!(zone = %self.zone, error = %e, "read failed, keeping last snapshot");
                return Err(Error::Read(e));
            }
        };

        let next = self.merge(&payload);
        self.publish(next);
        info!(zone = %self.zone, "telemetry read ok");
        Ok(self.state.clone())
    }

    async fn fetch_telemetry(&mut self) -> std::result::Result<Payload, ReadError> {
        let token = self
            .tokens
            .ensure_token(&self.transport, &self.creds, self.logger.as_mut())
            .await?;
        if let Ok(payload) = self.fetch_once(&token).await? {
            return Ok(payload);
        }

        warn!(zone = %self.zone, "telemetry did not decode, refreshing token");
        self.tokens.invalidate();
        let token = self
            .tokens
            .ensure_token(&self.transport, &self.creds, self.logger.as_mut())
            .await?;
        self.fetch_once(&token).await?.map_err(ReadError::Decode)
    }

    /// Outer error is terminal; inner error is a decode failure the caller may retry.
    async fn fetch_once(
        &mut self,
        token: &str,
    ) -> std::result::Result<std::result::Result<Payload, serde_json::Error>, ReadError> {
        let query = telemetry_query(self.creds.device_id(), token, now_ms());
        let (status, body) = self
            .transport
            .telemetry(&query)
            .await
            .map_err(ReadError::Transport)?;

        if !(200..300).contains(&status) {
            if let Some(ref mut logger) = self.logger {
                logger.log_read(self.zone, status, None);
            }
            return Err(ReadError::Status(status));
        }

        let decoded = serde_json::from_str::<Payload>(&body);
        if let Some(ref mut logger) = self.logger {
            match &decoded {
                Ok(payload) => {
                    let body = Value::Object(payload.clone());
                    logger.log_read(self.zone, status, Some(&body))
                }
                Err(_) => logger.log_read(self.zone, status, None),
            }
        }
        if let Err(e) = &decoded {
            debug!(zone = %self.zone, error = %e, body_len = body.len(), "telemetry decode failed");
        }
        Ok(decoded)
    }

    /// Resolve every field, falling back to the current snapshot for
    /// temperatures the payload leaves out.
    fn merge(&mut self, payload: &Payload) -> ZoneState {
        let prev = self.state.clone();

        let reported_target = resolve(payload, &self.keys.target, to_f64, None);
        let target_temperature = self.settle_target(reported_target, prev.target_temperature);
        let current_temperature =
            resolve(payload, &self.keys.current, to_f64, prev.current_temperature);
        let frost = resolve(payload, &self.keys.frost, to_f64, prev.frost);

        let unset = || Some(Resolved::Cast("0".to_string()));
        let status = resolve(payload, &self.keys.heating, to_text, unset());
        let mode = resolve(payload, &self.keys.mode, to_text, unset());

        ZoneState {
            current_temperature,
            target_temperature,
            frost,
            heating_active: flag_set(&status),
            // The portal's mode flag is inverted: "1" means switched off.
            operation_mode: if flag_set(&mode) {
                OperationMode::Off
            } else {
                OperationMode::On
            },
        }
    }

    fn settle_target(
        &mut self,
        reported: Option<Reading>,
        previous: Option<Reading>,
    ) -> Option<Reading> {
        if let Some(hold) = &mut self.hold {
            let confirmed = reported == Some(Resolved::Cast(hold.requested));
            if !confirmed {
                // No read before the write: the first report seen is the old setpoint.
                if reported.is_some() && hold.stale.is_none() {
                    hold.stale = reported.clone();
                }
                if reported.is_none() || reported == hold.stale {
                    debug!(
                        zone = %self.zone,
                        requested = hold.requested,
                        "portal still reports old setpoint"
                    );
                    return Some(Resolved::Cast(hold.requested));
                }
            }
            self.hold = None;
        }
        if reported.is_some() {
            self.last_reported_target = reported.clone();
        }
        reported.or(previous)
    }

    fn publish(&mut self, next: ZoneState) {
        let events = snapshot_events(self.zone, &self.state, &next);
        self.state = next;

        for event in &events {
            for cb in &self.event_callbacks {
                cb(event);
            }
        }
        for cb in &self.snapshot_callbacks {
            cb(&self.state);
        }
        if !events.is_empty() {
            debug!(zone = %self.zone, count = events.len(), "snapshot changed");
        }
    }

    // -- Command writer --

    /// Set the zone's target temperature in Celsius.
    ///
    /// On success the new target shows up in the snapshot straight away and
    /// stays there until the portal reports a different setpoint, so the
    /// next poll does not flip it back to the old value.
    pub async fn set_temperature(&mut self, celsius: f64) -> Result<()> {
        if !(MIN_TEMP..=MAX_TEMP).contains(&celsius) {
            return Err(Error::InvalidTemperature(celsius));
        }

        let token = self.command_token().await?;
        let form = set_temperature_form(&token, self.creds.device_id(), self.zone, celsius);
        self.submit("set_temperature", &form).await?;
        info!(zone = %self.zone, temp = celsius, "setpoint accepted");

        self.hold = Some(SetpointHold {
            requested: celsius,
            stale: self.last_reported_target.clone(),
        });
        let mut next = self.state.clone();
        next.target_temperature = Some(Resolved::Cast(celsius));
        self.publish(next);
        Ok(())
    }

    /// Switch the zone on (heat) or off.
    pub async fn set_mode(&mut self, mode: OperationMode) -> Result<()> {
        let token = self.command_token().await?;
        let form = set_mode_form(&token, self.creds.device_id(), self.zone, mode);
        self.submit("set_mode", &form).await?;
        info!(zone = %self.zone, ?mode, "mode accepted");

        let mut next = self.state.clone();
        next.operation_mode = mode;
        self.publish(next);
        Ok(())
    }

    async fn command_token(&mut self) -> Result<String> {
        self.tokens
            .ensure_token(&self.transport, &self.creds, self.logger.as_mut())
            .await
            .map_err(|e| {
                warn!(zone = %self.zone, error = %e, "no token for command");
                Error::Write(WriteError::Auth(e))
            })
    }

    async fn submit(&mut self, action: &str, form: &Form) -> std::result::Result<(), WriteError> {
        let result = self.transport.command(form).await;

        if let Some(ref mut logger) = self.logger {
            let status = result.as_ref().ok().copied();
            logger.log_command(action, self.zone, &loggable_fields(form), status);
        }

        match result {
            Ok(status) if (200..300).contains(&status) => Ok(()),
            Ok(status) => {
                warn!(zone = %self.zone, action, status, "command rejected");
                Err(WriteError::Status(status))
            }
            Err(e) => {
                warn!(zone = %self.zone, action, error = %e, "command failed");
                Err(WriteError::Transport(e))
            }
        }
    }
}

fn flag_set(flag: &Option<Resolved<String>>) -> bool {
    matches!(flag, Some(Resolved::Cast(s)) if s == "1")
}

fn loggable_fields(form: &Form) -> Value {
    let map: Map<String, Value> = form
        .iter()
        .filter(|(k, _)| k != "token")
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    Value::Object(map)
}
