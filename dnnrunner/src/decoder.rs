use std::collections::HashMap;
use std::fmt;

use anyhow::Result;
use once_cell::sync::Lazy;

use crate::error::RunnerError;
use crate::layout::LayoutTable;

/// Turns encoded weight bytes into the flat numeric weight buffer.
pub trait WeightDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8], layout: &LayoutTable) -> Result<Vec<f32>>;
}

impl<F> WeightDecoder for F
where
    F: Fn(&[u8], &LayoutTable) -> Result<Vec<f32>> + Send + Sync,
{
    fn decode(&self, bytes: &[u8], layout: &LayoutTable) -> Result<Vec<f32>> {
        (self)(bytes, layout)
    }
}

/// Little-endian `f32` values stored back to back.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawF32Decoder;

impl WeightDecoder for RawF32Decoder {
    fn decode(&self, bytes: &[u8], layout: &LayoutTable) -> Result<Vec<f32>> {
        let elem = std::mem::size_of::<f32>();
        if bytes.len() % elem != 0 {
            return Err(RunnerError::Decode(format!(
                "raw weight blob of {} bytes is not a whole number of f32 values",
                bytes.len()
            ))
            .into());
        }
        if bytes.len() / elem != layout.total_size {
            return Err(RunnerError::Decode(format!(
                "raw weight blob holds {} values, weight total_size is {}",
                bytes.len() / elem,
                layout.total_size
            ))
            .into());
        }
        if cfg!(target_endian = "little") {
            Ok(bytemuck::pod_collect_to_vec::<u8, f32>(bytes))
        } else {
            Ok(bytes
                .chunks_exact(elem)
                .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect())
        }
    }
}

/// Decoders keyed by the descriptor's `weight_encoding` identifier.
#[derive(Default)]
pub struct DecoderRegistry {
    decoders: HashMap<String, Box<dyn WeightDecoder>>,
}

impl DecoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the builtin decoders (`raw`).
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("raw", RawF32Decoder);
        registry
    }

    pub fn register(&mut self, encoding: impl Into<String>, decoder: impl WeightDecoder + 'static) {
        self.decoders.insert(encoding.into(), Box::new(decoder));
    }

    pub fn with(mut self, encoding: impl Into<String>, decoder: impl WeightDecoder + 'static) -> Self {
        self.register(encoding, decoder);
        self
    }

    pub fn decoder_for(&self, encoding: &str) -> Result<&dyn WeightDecoder> {
        self.decoders
            .get(encoding)
            .map(|decoder| decoder.as_ref())
            .ok_or_else(|| RunnerError::UnsupportedEncoding(encoding.to_string()).into())
    }

    pub fn encodings(&self) -> impl Iterator<Item = &str> {
        self.decoders.keys().map(String::as_str)
    }
}

impl fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut encodings = self.encodings().collect::<Vec<_>>();
        encodings.sort_unstable();
        f.debug_struct("DecoderRegistry")
            .field("encodings", &encodings)
            .finish()
    }
}

static DEFAULT_DECODERS: Lazy<DecoderRegistry> = Lazy::new(DecoderRegistry::builtin);

/// Look up a builtin decoder by encoding identifier.
pub fn decoder_for(encoding: &str) -> Result<&'static dyn WeightDecoder> {
    DEFAULT_DECODERS.decoder_for(encoding)
}
