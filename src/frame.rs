use crate::detection::Detection;
use crate::error::Error;

/// Detections reported for one frame, indexed from 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub index: u64,
    pub detections: Vec<Detection>,
}

impl Frame {
    #[inline]
    pub fn new(index: u64, detections: Vec<Detection>) -> Self {
        Self { index, detections }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.detections.len()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.detections.iter()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    /// `"<index>: <json array>"`, the line format of `.dets` files.
    pub fn to_line(&self) -> Result<String, Error> {
        Ok(format!(
            "{}: {}",
            self.index,
            serde_json::to_string(&self.detections)?
        ))
    }

    /// Parses one `.dets` line; `line_no` is only used for error reporting.
    pub fn parse_line(line: &str, line_no: usize) -> Result<Self, Error> {
        let bad = |reason: String| Error::DetsFormat {
            line: line_no,
            reason,
        };

        let idx = line
            .find(':')
            .ok_or_else(|| bad("missing ':' separator".into()))?;
        let (index, vector) = line.split_at(idx);

        let index = index
            .trim()
            .parse::<u64>()
            .map_err(|e| bad(format!("frame index: {}", e)))?;
        let detections = serde_json::from_str(vector[1..].trim())
            .map_err(|e| bad(format!("parse json failed: {}", e)))?;

        Ok(Self { index, detections })
    }
}
