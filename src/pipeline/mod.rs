//! Document pipeline: external tool composition over the ordered inputs.
//!
//! ## Data flow
//!
//! ```text
//! ordered paths ──▶ produce ──▶ output PDF bytes
//!                     │
//!                     ├─ Strategy A: convert [compress] <paths…> pdf:-
//!                     └─ Strategy B: pdfunite <paths…> /dev/stdout
//!                                    └─(compress)─▶ convert … - pdf:-
//!
//! paired file ──▶ preview ──▶ displayable bytes
//!                   ├─ image/*: raw file bytes
//!                   └─ PDF: pdfseparate -f 1 -l 1 … ──▶ convert … - jpeg:-
//! ```
//!
//! Every stage is all-or-nothing: a non-zero exit from any tool aborts the
//! whole submission or preview, and nothing reaches the output store. All
//! inter-stage transfer is in-memory byte buffers over process pipes; no
//! stage writes an intermediate file.

pub mod preview;
pub mod process;
pub mod produce;
