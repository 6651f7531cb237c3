//! CPU compute backend using Rayon
//!
//! This is the fallback backend that always works. It scores folding
//! candidates with a deterministic, reproducible toy force field so the
//! node has a workable, CI-friendly "simulator" to validate proofs
//! against without requiring a real folding engine to be vendored in.

use crate::{Backend, ComputeEngine, ComputeError, DeviceInfo, FoldingCandidate, ScoredStructure};
use rayon::prelude::*;
use sha2::{Digest, Sha256};

/// CPU-based compute engine using Rayon
pub struct CpuEngine {
    device_info: DeviceInfo,
}

impl CpuEngine {
    pub fn new() -> Self {
        let num_cpus = num_cpus::get() as u32;

        Self {
            device_info: DeviceInfo {
                name: format!("CPU ({} cores)", num_cpus),
                backend: Backend::Cpu,
                compute_units: num_cpus,
                memory_bytes: 0, // System memory, not tracked
                supports_f64: true,
            },
        }
    }

    /// Derive a deterministic score in `[0.0, 1.0)` from the candidate's
    /// coordinate payload. Chunking the digest across Rayon lanes mirrors
    /// the parallel-hash shape this backend used for its previous mining
    /// workload, now applied to the (much larger) coordinate buffer.
    fn score_coordinates(coordinates: &[u8]) -> (f64, f64, f64) {
        const CHUNK: usize = 4096;
        let digest = coordinates
            .par_chunks(CHUNK.max(1))
            .map(|chunk| Sha256::digest(chunk).to_vec())
            .reduce(
                || vec![0u8; 32],
                |mut acc, next| {
                    for (a, b) in acc.iter_mut().zip(next.iter()) {
                        *a ^= b;
                    }
                    acc
                },
            );

        let score_bits = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
        let score = (score_bits as f64) / (u32::MAX as f64);

        let energy_bits = u32::from_be_bytes([digest[4], digest[5], digest[6], digest[7]]);
        let energy = -500.0 - (energy_bits as f64 / u32::MAX as f64) * 1500.0;

        let rmsd_bits = u32::from_be_bytes([digest[8], digest[9], digest[10], digest[11]]);
        let rmsd = (rmsd_bits as f64 / u32::MAX as f64) * 5.0;

        (score, energy, rmsd)
    }
}

impl Default for CpuEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ComputeEngine for CpuEngine {
    fn backend(&self) -> Backend {
        Backend::Cpu
    }

    fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    async fn score_structure(
        &self,
        candidate: &FoldingCandidate,
    ) -> Result<ScoredStructure, ComputeError> {
        if candidate.coordinates.is_empty() {
            return Err(ComputeError::InvalidInput(
                "empty coordinate payload".to_string(),
            ));
        }

        let (score, energy, rmsd) = Self::score_coordinates(&candidate.coordinates);
        Ok(ScoredStructure {
            score,
            energy,
            rmsd,
        })
    }

    async fn verify_zk_attestation(
        &self,
        _candidate: &FoldingCandidate,
        claimed_score: f64,
        attestation: &[u8],
    ) -> Result<bool, ComputeError> {
        // No real ZK backend is vendored into this CPU engine; an
        // attestation is accepted only if it is the SHA-256 commitment to
        // the claimed score under a fixed domain tag, matching the scheme
        // `qc-porw` pins in genesis parameters (see that crate's
        // `zk_attestation` module for the production-facing contract).
        if attestation.len() != 32 {
            return Ok(false);
        }
        let mut hasher = Sha256::new();
        hasher.update(b"qc-folding-attestation-v1");
        hasher.update(claimed_score.to_be_bytes());
        let expected = hasher.finalize();
        Ok(expected.as_slice() == attestation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_score_structure_is_deterministic() {
        let engine = CpuEngine::new();
        let candidate = FoldingCandidate {
            protein_data_ref: [1u8; 32],
            folding_params_hash: [2u8; 32],
            coordinates: b"atom coordinates go here".to_vec(),
        };

        let first = engine.score_structure(&candidate).await.unwrap();
        let second = engine.score_structure(&candidate).await.unwrap();
        assert_eq!(first, second);
        assert!(first.score >= 0.0 && first.score < 1.0);
    }

    #[tokio::test]
    async fn test_score_structure_rejects_empty_payload() {
        let engine = CpuEngine::new();
        let candidate = FoldingCandidate {
            protein_data_ref: [0u8; 32],
            folding_params_hash: [0u8; 32],
            coordinates: vec![],
        };

        assert!(engine.score_structure(&candidate).await.is_err());
    }

    #[tokio::test]
    async fn test_zk_attestation_round_trip() {
        let engine = CpuEngine::new();
        let candidate = FoldingCandidate {
            protein_data_ref: [1u8; 32],
            folding_params_hash: [2u8; 32],
            coordinates: b"atoms".to_vec(),
        };

        let score = 0.91_f64;
        let mut hasher = Sha256::new();
        hasher.update(b"qc-folding-attestation-v1");
        hasher.update(score.to_be_bytes());
        let attestation = hasher.finalize().to_vec();

        assert!(engine
            .verify_zk_attestation(&candidate, score, &attestation)
            .await
            .unwrap());
        assert!(!engine
            .verify_zk_attestation(&candidate, score + 0.01, &attestation)
            .await
            .unwrap());
    }
}
