// @generated
// This file is @generated by prost-build.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HandshakeRequest {
    #[prost(string, tag = "1")]
    pub engine_address: ::prost::alloc::string::String,
}
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct HandshakeResponse {}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConfigureStackRequest {
    #[prost(string, tag = "1")]
    pub stack: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub project: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub organization: ::prost::alloc::string::String,
    #[prost(bool, tag = "4")]
    pub dry_run: bool,
}
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ConfigureStackResponse {}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AnalyzeRequest {
    #[prost(string, tag = "1")]
    pub urn: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub r#type: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub name: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "4")]
    pub properties: ::core::option::Option<::prost_types::Struct>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AnalyzeResponse {
    #[prost(message, repeated, tag = "1")]
    pub diagnostics: ::prost::alloc::vec::Vec<Diagnostic>,
}
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct AnalyzeStackRequest {}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AnalyzeStackResponse {
    #[prost(message, repeated, tag = "1")]
    pub diagnostics: ::prost::alloc::vec::Vec<Diagnostic>,
}
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct CancelRequest {}
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct CancelResponse {}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Diagnostic {
    #[prost(string, tag = "1")]
    pub policy_name: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub description: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub message: ::prost::alloc::string::String,
    #[prost(enumeration = "EnforcementLevel", tag = "4")]
    pub enforcement_level: i32,
    #[prost(enumeration = "Severity", tag = "5")]
    pub severity: i32,
    #[prost(string, tag = "6")]
    pub urn: ::prost::alloc::string::String,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum EnforcementLevel {
    Advisory = 0,
    Mandatory = 1,
}
impl EnforcementLevel {
    /// String value of the enum field names used in the ProtoBuf definition.
    ///
    /// The values are not transformed in any way and thus are considered stable
    /// (if the ProtoBuf definition does not change) and safe for programmatic use.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Advisory => "ENFORCEMENT_LEVEL_ADVISORY",
            Self::Mandatory => "ENFORCEMENT_LEVEL_MANDATORY",
        }
    }
    /// Creates an enum from field names used in the ProtoBuf definition.
    pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
        match value {
            "ENFORCEMENT_LEVEL_ADVISORY" => Some(Self::Advisory),
            "ENFORCEMENT_LEVEL_MANDATORY" => Some(Self::Mandatory),
            _ => None,
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Severity {
    Unspecified = 0,
    Low = 1,
    Medium = 2,
    High = 3,
}
impl Severity {
    /// String value of the enum field names used in the ProtoBuf definition.
    ///
    /// The values are not transformed in any way and thus are considered stable
    /// (if the ProtoBuf definition does not change) and safe for programmatic use.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Unspecified => "SEVERITY_UNSPECIFIED",
            Self::Low => "SEVERITY_LOW",
            Self::Medium => "SEVERITY_MEDIUM",
            Self::High => "SEVERITY_HIGH",
        }
    }
    /// Creates an enum from field names used in the ProtoBuf definition.
    pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
        match value {
            "SEVERITY_UNSPECIFIED" => Some(Self::Unspecified),
            "SEVERITY_LOW" => Some(Self::Low),
            "SEVERITY_MEDIUM" => Some(Self::Medium),
            "SEVERITY_HIGH" => Some(Self::High),
            _ => None,
        }
    }
}
include!("analyzer.v1.tonic.rs");
// @@protoc_insertion_point(module)
