//! Client → server realtime messages.
//!
//! Every frame is a JSON envelope `{"event": <name>, "data": {...}}`.
//! Server → client messages are [`crate::domain::ServerEvent`].

use serde::Deserialize;

use crate::domain::{DriverId, RiderId};

/// Role a client claims in a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientRole {
    /// Driver app.
    Driver,
    /// Rider app.
    User,
}

/// Messages a client can send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Driver heartbeat, optionally relayed to the rider of an ongoing ride.
    LocationUpdate(LocationUpdate),
    /// Subscribe this connection to a rider's personal room.
    JoinUserRoom(JoinUserRoom),
    /// Rider asks for drivers around a point.
    RequestRide(NearbyRequest),
}

/// Payload of `locationUpdate`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    /// Must be `driver`.
    pub role: ClientRole,
    /// Reporting driver.
    pub driver_id: DriverId,
    /// Rider to relay the position to, during a ride.
    #[serde(default)]
    pub user_id: Option<RiderId>,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Compass heading in degrees.
    #[serde(default)]
    pub heading: Option<f64>,
    /// Ground speed in m/s.
    #[serde(default)]
    pub speed: Option<f64>,
}

/// Payload of `joinUserRoom`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinUserRoom {
    /// Rider whose room to join.
    pub user_id: RiderId,
}

/// Payload of `requestRide`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyRequest {
    /// Must be `user`.
    pub role: ClientRole,
    /// Requesting rider.
    pub user_id: RiderId,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_location_update() {
        let driver = DriverId::new();
        let json = format!(
            r#"{{"event":"locationUpdate","data":{{"role":"driver","driverId":"{driver}","latitude":12.93,"longitude":77.61,"heading":45.0}}}}"#
        );
        let Ok(ClientEvent::LocationUpdate(update)) = serde_json::from_str::<ClientEvent>(&json)
        else {
            panic!("expected locationUpdate");
        };
        assert_eq!(update.driver_id, driver);
        assert_eq!(update.role, ClientRole::Driver);
        assert_eq!(update.user_id, None);
        assert_eq!(update.heading, Some(45.0));
    }

    #[test]
    fn parses_join_and_request() {
        let rider = RiderId::new();
        let join = format!(r#"{{"event":"joinUserRoom","data":{{"userId":"{rider}"}}}}"#);
        assert_eq!(
            serde_json::from_str::<ClientEvent>(&join).ok(),
            Some(ClientEvent::JoinUserRoom(JoinUserRoom { user_id: rider }))
        );

        let request = format!(
            r#"{{"event":"requestRide","data":{{"role":"user","userId":"{rider}","latitude":1.0,"longitude":2.0}}}}"#
        );
        assert!(matches!(
            serde_json::from_str::<ClientEvent>(&request),
            Ok(ClientEvent::RequestRide(_))
        ));
    }

    #[test]
    fn unknown_event_is_rejected() {
        let json = r#"{"event":"startRide","data":{}}"#;
        assert!(serde_json::from_str::<ClientEvent>(json).is_err());
    }
}
