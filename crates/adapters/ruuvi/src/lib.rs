//! # homebus-adapter-ruuvi
//!
//! Ruuvi adapter — consumes sensor readings relayed over the HTTP bridge
//! and publishes them as state facts.
//!
//! A Ruuvi gateway POSTs one JSON document per BLE advertisement. The
//! adapter claims its URL path on `http:register-path`, answers each
//! `http-request:<path>` event, and publishes a `state:update` per reading
//! under `ruuvi.<room>.<measurement>`, plus a dewpoint derived from
//! temperature and humidity.

use std::collections::HashMap;

use serde_json::Value;

use homebus_app::bus::{EventBus, Publisher};
use homebus_app::logging::Logger;
use homebus_domain::event::{Event, Payload};
use homebus_domain::topic;

/// Sensor fields relayed verbatim: JSON field name → state key suffix.
const FIELDS: [(&str, &str); 5] = [
    ("temperature", "temp_celcius"),
    ("humidity", "humidity"),
    ("pressure", "pressure"),
    ("voltage", "voltage"),
    ("txpower", "txpower"),
];

/// Adapter configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// URL path the gateway POSTs to.
    pub path: String,
    /// BLE MAC address → room name. Readings from unknown addresses are
    /// acknowledged but not published.
    pub sensors: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: "/ruuvi".to_string(),
            sensors: HashMap::new(),
        }
    }
}

/// Answer bridge requests until the bus shuts down.
pub async fn run(bus: EventBus, config: Config) {
    let publisher = bus.publisher();
    let logger = Logger::new(&bus);

    let mut requests = bus.subscribe(topic::http_request(&config.path));
    if publisher
        .publish(Event::value(topic::HTTP_REGISTER_PATH, config.path.clone()))
        .await
        .is_err()
    {
        return;
    }

    while let Some(payload) = requests.recv().await {
        let Payload::HttpRequest { id, body } = payload else {
            continue;
        };
        let (status, body) = handle_reading(&publisher, &logger, &config, &body).await;
        let response = Event::new(topic::http_response(&id), Payload::HttpResponse {
            id: id.clone(),
            status,
            body,
        });
        if publisher.publish(response).await.is_err() {
            return;
        }
    }
}

async fn handle_reading(
    publisher: &Publisher,
    logger: &Logger,
    config: &Config,
    body: &str,
) -> (u16, String) {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return (400, "invalid JSON".to_string());
    };

    let mac = json
        .pointer("/device/address")
        .and_then(Value::as_str)
        .unwrap_or_default();

    if let Some(room) = config.sensors.get(mac) {
        for (field, suffix) in FIELDS {
            if let Some(value) = sensor_value(&json, field) {
                let key = format!("ruuvi.{room}.{suffix}");
                let update = Event::key_value(topic::STATE_UPDATE, key, value);
                if publisher.publish(update).await.is_err() {
                    return (503, "event bus unavailable".to_string());
                }
            }
        }

        let temperature = sensor_number(&json, "temperature");
        let humidity = sensor_number(&json, "humidity");
        if let (Some(temperature), Some(humidity)) = (temperature, humidity) {
            match dew_point(temperature, humidity) {
                Ok(dewpoint) => {
                    let key = format!("ruuvi.{room}.dewpoint_celcius");
                    let update =
                        Event::key_value(topic::STATE_UPDATE, key, dewpoint.to_string());
                    if publisher.publish(update).await.is_err() {
                        return (503, "event bus unavailable".to_string());
                    }
                }
                Err(err) => {
                    logger
                        .error(format!("ruuvi: error calculating dewpoint - {err}"))
                        .await;
                }
            }
        }
    }

    (200, "OK".to_string())
}

/// The raw JSON token for a sensor field, when it is a number.
fn sensor_value(json: &Value, field: &str) -> Option<String> {
    match json.pointer(&format!("/sensors/{field}"))? {
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn sensor_number(json: &Value, field: &str) -> Option<f64> {
    json.pointer(&format!("/sensors/{field}"))
        .and_then(Value::as_f64)
}

#[derive(Debug, thiserror::Error)]
enum DewPointError {
    #[error("temperature must be between -45 and +60 celsius")]
    TemperatureOutOfRange,
    #[error("humidity must be above 0 and at most 100 percent")]
    HumidityOutOfRange,
}

/// Magnus-formula dewpoint, rounded to two decimals.
fn dew_point(temperature: f64, humidity: f64) -> Result<f64, DewPointError> {
    if !(-45.0..=60.0).contains(&temperature) {
        return Err(DewPointError::TemperatureOutOfRange);
    }
    // zero is excluded: ln(0) would turn the result into NaN
    if humidity <= 0.0 || humidity > 100.0 {
        return Err(DewPointError::HumidityOutOfRange);
    }

    const A: f64 = 17.62;
    const B: f64 = 243.12;

    let alpha = (humidity / 100.0).ln() + A * temperature / (B + temperature);
    Ok((((B * alpha) / (A - alpha)) * 100.0).round() / 100.0)
}
