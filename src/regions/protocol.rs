//! Messages exchanged with the region worker.
//!
//! The serde shape is the wire format of the worker channel:
//! `{"type":"FIND_REGIONS","data":{...}}` in, `{"type":"REGIONS_FOUND","data":{"regions":[...]}}`
//! out. In-process the messages are moved through the channel, so the pixel buffer changes owner
//! instead of being copied.

use crate::foundation::core::Region;

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerRequest {
    FindRegions(FindRegionsRequest),
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindRegionsRequest {
    /// RGBA8 bytes, row-major, `width * height * 4` long.
    pub pixel_buffer: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub min_region_size: u32,
    pub block_size: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerResponse {
    RegionsFound(RegionsFound),
    AnalysisFailed(AnalysisFailed),
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RegionsFound {
    pub regions: Vec<Region>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AnalysisFailed {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_shape() {
        let req = WorkerRequest::FindRegions(FindRegionsRequest {
            pixel_buffer: vec![0, 0, 0, 0],
            width: 1,
            height: 1,
            min_region_size: 10,
            block_size: 4,
        });
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "type": "FIND_REGIONS",
                "data": {
                    "pixelBuffer": [0, 0, 0, 0],
                    "width": 1,
                    "height": 1,
                    "minRegionSize": 10,
                    "blockSize": 4
                }
            })
        );
    }

    #[test]
    fn response_wire_shape() {
        let resp = WorkerResponse::RegionsFound(RegionsFound {
            regions: vec![Region {
                min_x: 1,
                min_y: 2,
                max_x: 30,
                max_y: 40,
            }],
        });
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(
            json,
            r#"{"type":"REGIONS_FOUND","data":{"regions":[{"minX":1,"minY":2,"maxX":30,"maxY":40}]}}"#
        );
        let back: WorkerResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back, resp);
    }

    #[test]
    fn malformed_response_is_rejected() {
        let bad = r#"{"type":"REGIONS_FOUND","data":{"regions":[{"minX":1}]}}"#;
        assert!(serde_json::from_str::<WorkerResponse>(bad).is_err());
        let unknown = r#"{"type":"SOMETHING_ELSE","data":{}}"#;
        assert!(serde_json::from_str::<WorkerResponse>(unknown).is_err());
    }
}
