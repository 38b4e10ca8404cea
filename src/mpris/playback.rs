//! Playback status, position and seeking for an MPRIS player.

use crate::karaoke::{KaraokeError, Seeker};
use crate::mpris::connection::{MprisError, get_dbus_conn};
use async_trait::async_trait;
use zbus::Proxy;
use zvariant::OwnedValue;

const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";
const PLAYER_IFACE: &str = "org.mpris.MediaPlayer2.Player";

fn parse_position_from_owned(val: &OwnedValue) -> Option<f64> {
    if let Ok(i) = val.downcast_ref::<i64>() {
        return Some(i as f64 / 1_000_000.0);
    }
    if let Ok(u) = val.downcast_ref::<u64>() {
        return Some(u as f64 / 1_000_000.0);
    }
    None
}

fn secs_to_micros(secs: f64) -> i64 {
    let micros = (secs * 1_000_000.0).round();
    if micros.is_finite() { micros as i64 } else { 0 }
}

async fn get_property(service: &str, name: &str) -> Result<Option<OwnedValue>, MprisError> {
    let conn = get_dbus_conn().await?;
    // Targeted Properties.Get avoids triggering GetAll on some players
    let props_proxy = Proxy::new(&conn, service, OBJECT_PATH, "org.freedesktop.DBus.Properties").await?;
    let Ok(reply) = props_proxy.call_method("Get", &(PLAYER_IFACE, name)).await else {
        return Ok(None);
    };
    Ok(reply.body().deserialize::<OwnedValue>().ok())
}

/// Query the playback position (seconds) of an MPRIS player.
pub async fn get_position(service: &str) -> Result<f64, MprisError> {
    if service.is_empty() {
        return Ok(0.0);
    }
    Ok(get_property(service, "Position")
        .await?
        .as_ref()
        .and_then(parse_position_from_owned)
        .unwrap_or(0.0))
}

/// Query the playback status ("Playing", "Paused", "Stopped").
pub async fn get_playback_status(service: &str) -> Result<String, MprisError> {
    if service.is_empty() {
        return Ok("Stopped".to_string());
    }
    Ok(get_property(service, "PlaybackStatus")
        .await?
        .and_then(|v| String::try_from(v).ok())
        .unwrap_or_else(|| "Stopped".to_string()))
}

/// Toggle play/pause on the player.
pub async fn play_pause(service: &str) -> Result<(), MprisError> {
    if service.is_empty() {
        return Ok(());
    }
    let conn = get_dbus_conn().await?;
    let player_proxy = Proxy::new(&conn, service, OBJECT_PATH, PLAYER_IFACE).await?;
    player_proxy.call_method("PlayPause", &()).await?;
    Ok(())
}

/// Move the player to an absolute position in seconds.
///
/// MPRIS `Seek` takes a relative offset in microseconds, so the offset is
/// computed against the position the player reports right now.
pub async fn seek_to(service: &str, position_secs: f64) -> Result<(), MprisError> {
    if service.is_empty() {
        return Ok(());
    }
    let current = get_position(service).await?;
    let offset = secs_to_micros(position_secs) - secs_to_micros(current);
    if offset == 0 {
        return Ok(());
    }
    let conn = get_dbus_conn().await?;
    let player_proxy = Proxy::new(&conn, service, OBJECT_PATH, PLAYER_IFACE).await?;
    player_proxy.call_method("Seek", &(offset,)).await?;
    Ok(())
}

/// [`Seeker`] backed by an MPRIS player.
#[derive(Debug, Clone)]
pub struct MprisSeeker {
    service: String,
}

impl MprisSeeker {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

#[async_trait]
impl Seeker for MprisSeeker {
    async fn seek_to(&self, position: f64) -> Result<(), KaraokeError> {
        seek_to(&self.service, position)
            .await
            .map_err(|e| KaraokeError::Seek(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn micros_conversion_rounds_and_guards() {
        assert_eq!(secs_to_micros(1.5), 1_500_000);
        assert_eq!(secs_to_micros(0.0000004), 0);
        assert_eq!(secs_to_micros(f64::NAN), 0);
    }

    #[test]
    fn position_parses_signed_and_unsigned() {
        let signed = zvariant::Value::from(2_500_000i64).try_to_owned().unwrap();
        assert_eq!(parse_position_from_owned(&signed), Some(2.5));
        let unsigned = zvariant::Value::from(1_000_000u64).try_to_owned().unwrap();
        assert_eq!(parse_position_from_owned(&unsigned), Some(1.0));
    }

    #[tokio::test]
    async fn empty_service_is_a_no_op() {
        assert_eq!(get_position("").await.unwrap(), 0.0);
        assert_eq!(get_playback_status("").await.unwrap(), "Stopped");
        seek_to("", 3.0).await.unwrap();
        play_pause("").await.unwrap();
    }
}
