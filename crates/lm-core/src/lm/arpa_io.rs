use std::collections::HashMap;
use std::fs::{self, File};
use std::path::Path;

use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use tracing::{debug_span, info};

use super::arpa::{BackoffModel, NgramWeights};
use super::LmError;
use crate::token::Token;

pub(super) const MAGIC: &[u8; 4] = b"LMBX";
pub(super) const VERSION: u8 = 1;
/// magic(4) + version(1) + reserved(3) + payload_len(4) + crc32(4)
pub(super) const HEADER_SIZE: usize = 4 + 1 + 3 + 4 + 4;

/// Serialized form of a model. Tokens are stored as strings because
/// interned ids are only meaningful inside one process.
#[derive(Serialize, Deserialize)]
struct ModelImage {
    name: String,
    order: u32,
    oov_log_prob: f32,
    /// (words, log_prob, backoff), sorted for reproducible output.
    ngrams: Vec<(Vec<String>, f32, f32)>,
}

impl BackoffModel {
    pub fn to_bytes(&self) -> Result<Vec<u8>, LmError> {
        let mut ngrams: Vec<(Vec<String>, f32, f32)> = self
            .ngrams
            .iter()
            .map(|(key, w)| {
                (
                    key.iter().map(|t| t.as_str().to_string()).collect(),
                    w.log_prob,
                    w.backoff,
                )
            })
            .collect();
        ngrams.sort_by(|a, b| a.0.len().cmp(&b.0.len()).then_with(|| a.0.cmp(&b.0)));

        let image = ModelImage {
            name: self.name.clone(),
            order: self.order as u32,
            oov_log_prob: self.oov_log_prob,
            ngrams,
        };
        let payload = bincode::serialize(&image).map_err(LmError::Serialize)?;
        let payload_len: u32 = payload
            .len()
            .try_into()
            .map_err(|_| LmError::InvalidModel("model image exceeds u32::MAX".into()))?;

        let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
        buf.extend_from_slice(MAGIC);
        buf.push(VERSION);
        buf.extend_from_slice(&[0u8; 3]); // reserved
        buf.extend_from_slice(&payload_len.to_le_bytes());
        buf.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, LmError> {
        if data.len() < 5 {
            return Err(LmError::InvalidHeader);
        }
        if &data[..4] != MAGIC {
            return Err(LmError::InvalidMagic);
        }
        if data[4] != VERSION {
            return Err(LmError::UnsupportedVersion(data[4]));
        }
        if data.len() < HEADER_SIZE {
            return Err(LmError::InvalidHeader);
        }

        let payload_len = read_u32(&data[8..12]) as usize;
        let expected_crc = read_u32(&data[12..16]);
        let payload = data
            .get(HEADER_SIZE..HEADER_SIZE + payload_len)
            .ok_or(LmError::InvalidHeader)?;
        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            return Err(LmError::ChecksumMismatch {
                expected: expected_crc,
                actual: actual_crc,
            });
        }

        let image: ModelImage = bincode::deserialize(payload).map_err(LmError::Deserialize)?;
        let mut ngrams = HashMap::with_capacity(image.ngrams.len());
        for (words, log_prob, backoff) in image.ngrams {
            let key: Box<[Token]> = words.iter().map(|w| Token::intern(w)).collect();
            ngrams.insert(key, NgramWeights { log_prob, backoff });
        }
        Self::from_parts(image.name, image.order as usize, ngrams, image.oov_log_prob)
    }

    /// Open a compiled model image through a read-only memory map.
    pub fn open(path: &Path) -> Result<Self, LmError> {
        let _span = debug_span!("model_open", path = %path.display()).entered();
        let file = File::open(path)?;
        // SAFETY: The file is opened read-only and the mapping is dropped
        // before this function returns; nothing borrows from it afterwards.
        let mmap = unsafe { Mmap::map(&file)? };
        let model = Self::from_bytes(&mmap)?;
        info!(order = model.order, counts = ?model.counts, "opened model image");
        Ok(model)
    }

    pub fn save(&self, path: &Path) -> Result<(), LmError> {
        Ok(fs::write(path, self.to_bytes()?)?)
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}
