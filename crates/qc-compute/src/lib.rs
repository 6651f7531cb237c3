//! # QC-Compute: Portable GPU/CPU Compute Abstraction
//!
//! This crate provides a vendor-agnostic compute layer for Quantum-Chain's
//! PoRW folding engine. It automatically selects the best available backend
//! at **runtime**:
//!
//! 1. **OpenCL** - Wide GPU support (NVIDIA, AMD, Intel, Apple)
//! 2. **CPU/Rayon** - Fallback, always works, zero dependencies
//!
//! ## Philosophy: No Vendor Lock-in, No Build Failures
//!
//! - **No CUDA**: Locks you into NVIDIA
//! - **No Vulkan shaders**: Requires shaderc/cmake, breaks CI
//! - **OpenCL**: Compiles anywhere, detects GPU at runtime
//! - **CPU**: Always works, parallel via Rayon
//!
//! The actual protein-folding simulator is a replaceable compute backend:
//! this crate only owns the contract for scoring a candidate structure and
//! verifying an optional zero-knowledge attestation over that score, not
//! the scientific heuristics used to pick folding targets in the first
//! place (those live outside the node entirely).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use qc_compute::auto_detect;
//!
//! // Auto-detect best backend (OpenCL GPU or CPU)
//! let engine = auto_detect()?;
//! println!("Using: {}", engine.backend());
//! ```

pub mod backends;

use std::sync::Arc;
use thiserror::Error;

/// Compute backend capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// CPU with Rayon parallelism
    Cpu,
    /// OpenCL (portable GPU)
    OpenCL,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Cpu => write!(f, "CPU (Rayon)"),
            Backend::OpenCL => write!(f, "OpenCL GPU"),
        }
    }
}

/// Compute engine errors
#[derive(Error, Debug)]
pub enum ComputeError {
    #[error("No compute backend available")]
    NoBackendAvailable,

    #[error("Backend initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Compute task failed: {0}")]
    TaskFailed(String),

    #[error("Timeout waiting for result")]
    Timeout,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Device information
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub backend: Backend,
    pub compute_units: u32,
    pub memory_bytes: u64,
    pub supports_f64: bool,
}

/// A folding candidate submitted for scoring: raw atomic coordinates plus
/// the hash of the folding parameters used to produce them.
#[derive(Debug, Clone)]
pub struct FoldingCandidate {
    /// Content-addressed identifier of the structure under evaluation.
    pub protein_data_ref: [u8; 32],
    /// Hash of the folding parameter set (force field, seed, iterations).
    pub folding_params_hash: [u8; 32],
    /// Raw coordinate payload (opaque to this crate; backend-specific).
    pub coordinates: Vec<u8>,
}

/// The outcome of scoring a folding candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredStructure {
    /// Quality score in `[0.0, 1.0]`; higher is better.
    pub score: f64,
    /// Free energy estimate in kcal/mol (implementation-defined units).
    pub energy: f64,
    /// Root-mean-square deviation against the reference fold, in Angstrom.
    pub rmsd: f64,
}

/// Compute engine trait - implemented by all backends.
///
/// This is the only seam between the node and the folding simulator: the
/// simulator itself (force field integration, energy minimization) is
/// entirely out of scope and may be swapped for any implementation that
/// satisfies this contract.
#[async_trait::async_trait]
pub trait ComputeEngine: Send + Sync {
    /// Get backend type
    fn backend(&self) -> Backend;

    /// Get device info
    fn device_info(&self) -> &DeviceInfo;

    /// Score a submitted folding structure, producing the quality metrics
    /// the PoRW validation contract checks against its acceptance
    /// threshold and re-scoring tolerance.
    async fn score_structure(
        &self,
        candidate: &FoldingCandidate,
    ) -> Result<ScoredStructure, ComputeError>;

    /// Verify an optional zero-knowledge attestation that a score was
    /// produced honestly against public parameters, without re-running
    /// the simulation. Returns `Ok(true)` when the attestation checks out.
    async fn verify_zk_attestation(
        &self,
        candidate: &FoldingCandidate,
        claimed_score: f64,
        attestation: &[u8],
    ) -> Result<bool, ComputeError>;
}

/// Auto-detect and create the best available compute engine
pub fn auto_detect() -> Result<Arc<dyn ComputeEngine>, ComputeError> {
    // Try backends in order of preference: GPU first, then CPU

    #[cfg(feature = "opencl")]
    {
        match backends::opencl::OpenCLEngine::new() {
            Ok(engine) => {
                tracing::info!(device = %engine.device_info().name, "GPU detected (OpenCL)");
                return Ok(Arc::new(engine));
            }
            Err(e) => {
                tracing::debug!(error = %e, "OpenCL not available");
            }
        }
    }

    #[cfg(feature = "cpu")]
    {
        let engine = backends::cpu::CpuEngine::new();
        tracing::info!(
            cores = engine.device_info().compute_units,
            "Using CPU compute (Rayon)"
        );
        return Ok(Arc::new(engine));
    }

    #[cfg(not(feature = "cpu"))]
    {
        Err(ComputeError::NoBackendAvailable)
    }
}

/// Create a specific backend
pub fn create_backend(backend: Backend) -> Result<Arc<dyn ComputeEngine>, ComputeError> {
    match backend {
        Backend::Cpu => {
            #[cfg(feature = "cpu")]
            {
                Ok(Arc::new(backends::cpu::CpuEngine::new()))
            }
            #[cfg(not(feature = "cpu"))]
            {
                Err(ComputeError::NoBackendAvailable)
            }
        }
        Backend::OpenCL => {
            #[cfg(feature = "opencl")]
            {
                backends::opencl::OpenCLEngine::new().map(|e| Arc::new(e) as Arc<dyn ComputeEngine>)
            }
            #[cfg(not(feature = "opencl"))]
            {
                Err(ComputeError::NoBackendAvailable)
            }
        }
    }
}
