// @generated
// This file is @generated by prost-build.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResourceDescriptor {
    #[prost(string, tag = "1")]
    pub r#type: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub id: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub provider: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "4")]
    pub properties: ::core::option::Option<::prost_types::Struct>,
}
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct NameRequest {}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NameResponse {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SupportsRequest {
    #[prost(string, tag = "1")]
    pub r#type: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SupportsResponse {
    #[prost(bool, tag = "1")]
    pub supported: bool,
    #[prost(string, tag = "2")]
    pub reason: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetProjectedCostRequest {
    #[prost(message, optional, tag = "1")]
    pub resource: ::core::option::Option<ResourceDescriptor>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetProjectedCostResponse {
    #[prost(double, tag = "1")]
    pub monthly: f64,
    #[prost(double, tag = "2")]
    pub hourly: f64,
    #[prost(string, tag = "3")]
    pub currency: ::prost::alloc::string::String,
    #[prost(map = "string, double", tag = "4")]
    pub breakdown: ::std::collections::HashMap<::prost::alloc::string::String, f64>,
    #[prost(string, tag = "5")]
    pub notes: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "6")]
    pub recommendations: ::prost::alloc::vec::Vec<Recommendation>,
    #[prost(map = "string, message", tag = "7")]
    pub sustainability: ::std::collections::HashMap<
        ::prost::alloc::string::String,
        SustainabilityMetric,
    >,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Recommendation {
    #[prost(string, tag = "1")]
    pub resource_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub r#type: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub description: ::prost::alloc::string::String,
    #[prost(double, tag = "4")]
    pub estimated_savings: f64,
    #[prost(string, tag = "5")]
    pub currency: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SustainabilityMetric {
    #[prost(double, tag = "1")]
    pub value: f64,
    #[prost(string, tag = "2")]
    pub unit: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetActualCostRequest {
    #[prost(string, tag = "1")]
    pub resource_id: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub start: ::core::option::Option<::prost_types::Timestamp>,
    #[prost(message, optional, tag = "3")]
    pub end: ::core::option::Option<::prost_types::Timestamp>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetActualCostResponse {
    #[prost(double, tag = "1")]
    pub total_cost: f64,
    #[prost(double, repeated, tag = "2")]
    pub daily_costs: ::prost::alloc::vec::Vec<f64>,
    #[prost(string, tag = "3")]
    pub currency: ::prost::alloc::string::String,
    #[prost(map = "string, double", tag = "4")]
    pub breakdown: ::std::collections::HashMap<::prost::alloc::string::String, f64>,
}
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetPluginInfoRequest {}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetPluginInfoResponse {
    #[prost(string, tag = "1")]
    pub version: ::prost::alloc::string::String,
    #[prost(string, repeated, tag = "2")]
    pub capabilities: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}
include!("costsource.v1.tonic.rs");
// @@protoc_insertion_point(module)
