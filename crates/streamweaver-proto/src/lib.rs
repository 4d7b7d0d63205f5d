//! StreamWeaver Protocol Buffer Definitions
//!
//! gRPC service and message types for the broker surface
//! (`CreateStream`, `Publish`). Generated by `tonic-build` from
//! `proto/broker.proto`.

/// Broker gRPC API.
pub mod broker {
    tonic::include_proto!("streamweaver.broker");
}
