//! Stdin processor for hook payloads
//!
//! Reads the single JSON document the host agent writes to stdin, with
//! timeout protection, a size cap, and a nesting-depth guard so a hostile
//! or broken payload cannot stall or exhaust the hook process.

use bytes::BytesMut;
use bumpers_core::constants::{
    JSON_DEPTH_MAX, MAX_INPUT_SIZE, STDIN_PROCESSING_TIMEOUT_MS, STDIN_READ_TIMEOUT_MS,
};
use bumpers_core::{BumpersError, HookInput, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::io::{AsyncReadExt, stdin};

/// JSON input processor for stdin.
pub struct StdinProcessor {
    buffer: BytesMut,
    read_buffer: Vec<u8>,
}

impl StdinProcessor {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            read_buffer: vec![0u8; 8192],
        }
    }

    /// Validate that input size is within limits
    fn validate_size(&self, size: usize) -> Result<()> {
        if size > MAX_INPUT_SIZE {
            return Err(BumpersError::InvalidInput {
                message: format!("Input size {size} exceeds maximum {MAX_INPUT_SIZE}"),
            });
        }
        Ok(())
    }

    /// Read and parse JSON from stdin with timeout and depth validation.
    pub async fn read_json<T>(&mut self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let input = match tokio::time::timeout(
            Duration::from_millis(STDIN_PROCESSING_TIMEOUT_MS),
            self.read_to_buffer_with_timeout(STDIN_READ_TIMEOUT_MS),
        )
        .await
        {
            Ok(Ok(buffer)) => buffer,
            Ok(Err(io_err)) => return Err(io_err),
            Err(_timeout) => {
                return Err(BumpersError::Timeout {
                    operation: "stdin_processing".to_string(),
                    timeout_ms: STDIN_PROCESSING_TIMEOUT_MS,
                });
            }
        };

        Self::validate_json_depth(input, JSON_DEPTH_MAX)?;
        serde_json::from_slice(input).map_err(BumpersError::Json)
    }

    /// Read stdin into the internal buffer with a timeout per read.
    async fn read_to_buffer_with_timeout(&mut self, timeout_ms: u64) -> Result<&[u8]> {
        self.buffer.clear();

        let mut stdin = stdin();
        loop {
            let n = tokio::time::timeout(
                Duration::from_millis(timeout_ms),
                stdin.read(&mut self.read_buffer),
            )
            .await
            .map_err(|_| BumpersError::Timeout {
                operation: "stdin_read".to_string(),
                timeout_ms,
            })?
            .map_err(BumpersError::Io)?;

            if n == 0 {
                break; // EOF reached
            }

            self.validate_size(self.buffer.len() + n)?;
            self.buffer.extend_from_slice(&self.read_buffer[..n]);
        }

        Ok(&self.buffer)
    }

    /// Read a [`HookInput`] payload from stdin.
    pub async fn read_hook_input(&mut self) -> Result<HookInput> {
        self.read_json().await
    }

    /// Validate JSON nesting depth to reject JSON bombs before parsing.
    pub fn validate_json_depth(input: &[u8], max_depth: u32) -> Result<()> {
        let mut depth = 0u32;
        let mut in_string = false;
        let mut escape_next = false;

        for &byte in input {
            if escape_next {
                escape_next = false;
                continue;
            }

            match byte {
                b'"' => in_string = !in_string,
                b'\\' if in_string => escape_next = true,
                b'{' | b'[' if !in_string => {
                    depth += 1;
                    if depth > max_depth {
                        return Err(BumpersError::InvalidInput {
                            message: format!(
                                "JSON nesting depth {depth} exceeds maximum {max_depth}"
                            ),
                        });
                    }
                }
                b'}' | b']' if !in_string => {
                    depth = depth.saturating_sub(1);
                }
                _ => {}
            }
        }

        Ok(())
    }
}

impl Default for StdinProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_validation_accepts_normal_payloads() {
        let payload = br#"{"tool_input":{"command":"ls"},"tool_name":"Bash"}"#;
        assert!(StdinProcessor::validate_json_depth(payload, JSON_DEPTH_MAX).is_ok());
    }

    #[test]
    fn test_depth_validation_rejects_bombs() {
        let bomb: Vec<u8> = std::iter::repeat_n(b'[', 200).collect();
        assert!(StdinProcessor::validate_json_depth(&bomb, JSON_DEPTH_MAX).is_err());
    }

    #[test]
    fn test_depth_validation_ignores_braces_in_strings() {
        let payload = br#"{"command":"echo {{{{[[[["}"#;
        assert!(StdinProcessor::validate_json_depth(payload, 4).is_ok());
    }

    #[test]
    fn test_size_validation() {
        let processor = StdinProcessor::new();
        assert!(processor.validate_size(1024).is_ok());
        assert!(processor.validate_size(MAX_INPUT_SIZE + 1).is_err());
    }
}
