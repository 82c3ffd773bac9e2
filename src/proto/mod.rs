//! Wire Types
//!
//! Generated protobuf/tonic code for the two gRPC surfaces, plus the
//! conversions between wire messages and domain schemas. The generated
//! files are checked in (regenerated from `proto/` with `buf generate`)
//! so the crate builds without a protoc toolchain.
//!
//! Providers signal "no data for this resource" with the `NOT_FOUND`
//! status code; every other non-OK status is treated as a transport-level
//! failure of that single call.

pub mod costsource {
    pub mod v1 {
        include!("costsource.v1.rs");
        // costsource.v1.tonic.rs is included by costsource.v1.rs
    }
}

pub mod analyzer {
    pub mod v1 {
        include!("analyzer.v1.rs");
        // analyzer.v1.tonic.rs is included by analyzer.v1.rs
    }
}

pub mod convert;
