//! Payload compression estimator. The simulator does not compress real
//! bytes; it models the size reduction a codec would achieve and accounts
//! for the savings.

use serde::Serialize;

/// Compressor statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CompressorStats {
    pub compression_ratio: f64,
    pub total_original_bytes: u64,
    pub total_compressed_bytes: u64,
    pub savings_pct: f64,
}

/// Simulates data compression for edge processing.
pub struct DataCompressor {
    /// Ratio of compressed size to original size (0.6 = 60% of original).
    compression_ratio: f64,
    total_original_bytes: u64,
    total_compressed_bytes: u64,
}

impl DataCompressor {
    pub fn new(compression_ratio: f64) -> Self {
        Self {
            compression_ratio,
            total_original_bytes: 0,
            total_compressed_bytes: 0,
        }
    }

    /// Estimate the compressed size for a payload and account the savings.
    pub fn estimate_compressed_size(&mut self, original_bytes: usize) -> usize {
        let compressed = (original_bytes as f64 * self.compression_ratio) as usize;
        self.total_original_bytes += original_bytes as u64;
        self.total_compressed_bytes += compressed as u64;
        compressed
    }

    pub fn savings_pct(&self) -> f64 {
        if self.total_original_bytes == 0 {
            return 0.0;
        }
        let saved = self.total_original_bytes - self.total_compressed_bytes;
        saved as f64 / self.total_original_bytes as f64 * 100.0
    }

    pub fn stats(&self) -> CompressorStats {
        CompressorStats {
            compression_ratio: self.compression_ratio,
            total_original_bytes: self.total_original_bytes,
            total_compressed_bytes: self.total_compressed_bytes,
            savings_pct: self.savings_pct(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_floors_fractional_bytes() {
        let mut comp = DataCompressor::new(0.6);
        assert_eq!(comp.estimate_compressed_size(100), 60);
        assert_eq!(comp.estimate_compressed_size(101), 60);
    }

    #[test]
    fn savings_accumulate() {
        let mut comp = DataCompressor::new(0.5);
        comp.estimate_compressed_size(1000);
        comp.estimate_compressed_size(1000);

        let stats = comp.stats();
        assert_eq!(stats.total_original_bytes, 2000);
        assert_eq!(stats.total_compressed_bytes, 1000);
        assert_eq!(stats.savings_pct, 50.0);
    }

    #[test]
    fn no_traffic_means_no_savings() {
        let comp = DataCompressor::new(0.6);
        assert_eq!(comp.savings_pct(), 0.0);
    }
}
