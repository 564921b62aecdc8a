//! `SidecarJson`: the schema of a Takeout `.json` sidecar, and the fields
//! this pipeline actually consumes (§6).

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PhotoTakenTime {
  pub timestamp: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CreationTime {
  pub timestamp: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GeoData {
  pub latitude:  Option<f64>,
  pub longitude: Option<f64>,
  pub altitude:  Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GooglePhotosOrigin {
  #[serde(rename = "fromPartnerSharing")]
  pub from_partner_sharing: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SidecarJson {
  pub title:       Option<String>,
  pub description: Option<String>,

  #[serde(rename = "creationTime")]
  pub creation_time: Option<CreationTime>,

  #[serde(rename = "photoTakenTime")]
  pub photo_taken_time: Option<PhotoTakenTime>,

  #[serde(rename = "geoData")]
  pub geo_data: Option<GeoData>,

  #[serde(rename = "googlePhotosOrigin")]
  pub google_photos_origin: Option<GooglePhotosOrigin>,
}

impl SidecarJson {
  pub fn parse(bytes: &[u8]) -> Result<Self, String> {
    serde_json::from_slice(bytes).map_err(|e| e.to_string())
  }

  /// `photoTakenTime.timestamp` as a UTC instant — §4.D resolver 1 (json).
  pub fn photo_taken_at(&self) -> Option<DateTime<Utc>> {
    let timestamp = self.photo_taken_time.as_ref()?.timestamp.as_ref()?;
    let epoch_seconds: i64 = timestamp.parse().ok()?;
    DateTime::from_timestamp(epoch_seconds, 0)
  }

  /// GPS coordinates, if present — primary GPS source for EXIF writing.
  /// Google encodes "no GPS" as `(0.0, 0.0)`, so that pair is treated as
  /// absent.
  pub fn coordinates(&self) -> Option<(f64, f64, Option<f64>)> {
    let geo = self.geo_data.as_ref()?;
    let (lat, lon) = (geo.latitude?, geo.longitude?);
    if lat == 0.0 && lon == 0.0 {
      return None;
    }
    Some((lat, lon, geo.altitude))
  }

  /// True when this media was shared by a Partner Sharing Library partner.
  pub fn is_partner_shared(&self) -> bool {
    self
      .google_photos_origin
      .as_ref()
      .is_some_and(|o| o.from_partner_sharing.is_some())
  }
}
