//! Wire types for the MGM gRPC service (package `eos.rpc`).
//!
//! Vendored generated-style prost/tonic code so builds do not depend on
//! protoc. Only the subset of the service the client exercises is carried:
//! `Ping`, the streaming `MD` and `Find` metadata calls, and `Exec` with the
//! namespace command envelope.

#![allow(clippy::all)]

/// Metadata query type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MdType {
    File = 0,
    Container = 1,
    Listing = 2,
    Stat = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum AclCommand {
    None = 0,
    Add = 1,
    Remove = 2,
    Modify = 3,
    List = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum AclType {
    None = 0,
    SysAcl = 1,
    UserAcl = 2,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PingRequest {
    #[prost(string, tag = "1")]
    pub authkey: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "2")]
    pub message: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PingReply {
    #[prost(bytes = "vec", tag = "1")]
    pub message: ::prost::alloc::vec::Vec<u8>,
}

/// Identity under which a request is executed.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RoleId {
    #[prost(uint64, tag = "1")]
    pub uid: u64,
    #[prost(uint64, tag = "2")]
    pub gid: u64,
    #[prost(string, tag = "3")]
    pub username: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub app: ::prost::alloc::string::String,
}

/// Addresses a namespace entry either by path or by inode.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MdId {
    #[prost(bytes = "vec", tag = "1")]
    pub path: ::prost::alloc::vec::Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub ino: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Timespec {
    #[prost(uint64, tag = "1")]
    pub sec: u64,
    #[prost(uint64, tag = "2")]
    pub n_sec: u64,
}

/// File metadata record.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FmdProto {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(uint64, tag = "2")]
    pub cont_id: u64,
    #[prost(uint64, tag = "3")]
    pub uid: u64,
    #[prost(uint64, tag = "4")]
    pub gid: u64,
    #[prost(uint64, tag = "5")]
    pub size: u64,
    #[prost(uint64, tag = "6")]
    pub flags: u64,
    #[prost(bytes = "vec", tag = "7")]
    pub name: ::prost::alloc::vec::Vec<u8>,
    #[prost(message, optional, tag = "8")]
    pub ctime: ::core::option::Option<Timespec>,
    #[prost(message, optional, tag = "9")]
    pub mtime: ::core::option::Option<Timespec>,
    #[prost(map = "string, bytes", tag = "10")]
    pub xattrs: ::std::collections::HashMap<
        ::prost::alloc::string::String,
        ::prost::alloc::vec::Vec<u8>,
    >,
    #[prost(bytes = "vec", tag = "11")]
    pub path: ::prost::alloc::vec::Vec<u8>,
    #[prost(string, tag = "12")]
    pub etag: ::prost::alloc::string::String,
}

/// Container metadata record.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ContainerMdProto {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(uint64, tag = "2")]
    pub parent_id: u64,
    #[prost(uint64, tag = "3")]
    pub uid: u64,
    #[prost(uint64, tag = "4")]
    pub gid: u64,
    #[prost(uint64, tag = "5")]
    pub tree_size: u64,
    #[prost(uint64, tag = "6")]
    pub mode: u64,
    #[prost(uint64, tag = "7")]
    pub flags: u64,
    #[prost(bytes = "vec", tag = "8")]
    pub name: ::prost::alloc::vec::Vec<u8>,
    #[prost(message, optional, tag = "9")]
    pub ctime: ::core::option::Option<Timespec>,
    #[prost(message, optional, tag = "10")]
    pub mtime: ::core::option::Option<Timespec>,
    #[prost(map = "string, bytes", tag = "11")]
    pub xattrs: ::std::collections::HashMap<
        ::prost::alloc::string::String,
        ::prost::alloc::vec::Vec<u8>,
    >,
    #[prost(bytes = "vec", tag = "12")]
    pub path: ::prost::alloc::vec::Vec<u8>,
    #[prost(string, tag = "13")]
    pub etag: ::prost::alloc::string::String,
    #[prost(uint64, tag = "14")]
    pub files: u64,
    #[prost(uint64, tag = "15")]
    pub containers: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MdRequest {
    #[prost(enumeration = "MdType", tag = "1")]
    pub r#type: i32,
    #[prost(message, optional, tag = "2")]
    pub id: ::core::option::Option<MdId>,
    #[prost(string, tag = "3")]
    pub authkey: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "4")]
    pub role: ::core::option::Option<RoleId>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MdResponse {
    #[prost(enumeration = "MdType", tag = "1")]
    pub r#type: i32,
    #[prost(message, optional, tag = "2")]
    pub fmd: ::core::option::Option<FmdProto>,
    #[prost(message, optional, tag = "3")]
    pub cmd: ::core::option::Option<ContainerMdProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FindRequest {
    #[prost(enumeration = "MdType", tag = "1")]
    pub r#type: i32,
    #[prost(message, optional, tag = "2")]
    pub id: ::core::option::Option<MdId>,
    #[prost(message, optional, tag = "3")]
    pub role: ::core::option::Option<RoleId>,
    #[prost(string, tag = "4")]
    pub authkey: ::prost::alloc::string::String,
    #[prost(uint64, tag = "5")]
    pub maxdepth: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MkdirRequest {
    #[prost(message, optional, tag = "1")]
    pub id: ::core::option::Option<MdId>,
    #[prost(int64, tag = "2")]
    pub mode: i64,
    #[prost(bool, tag = "3")]
    pub recursive: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RmdirRequest {
    #[prost(message, optional, tag = "1")]
    pub id: ::core::option::Option<MdId>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TouchRequest {
    #[prost(message, optional, tag = "1")]
    pub id: ::core::option::Option<MdId>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UnlinkRequest {
    #[prost(message, optional, tag = "1")]
    pub id: ::core::option::Option<MdId>,
    #[prost(bool, tag = "2")]
    pub norecycle: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChownRequest {
    #[prost(message, optional, tag = "1")]
    pub id: ::core::option::Option<MdId>,
    #[prost(message, optional, tag = "2")]
    pub owner: ::core::option::Option<RoleId>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChmodRequest {
    #[prost(message, optional, tag = "1")]
    pub id: ::core::option::Option<MdId>,
    #[prost(int64, tag = "2")]
    pub mode: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SetXAttrRequest {
    #[prost(message, optional, tag = "1")]
    pub id: ::core::option::Option<MdId>,
    #[prost(map = "string, bytes", tag = "2")]
    pub xattrs: ::std::collections::HashMap<
        ::prost::alloc::string::String,
        ::prost::alloc::vec::Vec<u8>,
    >,
    #[prost(bool, tag = "3")]
    pub recursive: bool,
    #[prost(string, repeated, tag = "4")]
    pub keystodelete: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AclRequest {
    #[prost(message, optional, tag = "1")]
    pub id: ::core::option::Option<MdId>,
    #[prost(enumeration = "AclCommand", tag = "2")]
    pub cmd: i32,
    #[prost(enumeration = "AclType", tag = "3")]
    pub r#type: i32,
    #[prost(bool, tag = "4")]
    pub recursive: bool,
    #[prost(string, tag = "5")]
    pub rule: ::prost::alloc::string::String,
}

/// Envelope for namespace-mutating commands.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NsRequest {
    #[prost(message, optional, tag = "1")]
    pub role: ::core::option::Option<RoleId>,
    #[prost(string, tag = "2")]
    pub authkey: ::prost::alloc::string::String,
    #[prost(oneof = "ns_request::Command", tags = "3, 4, 5, 6, 7, 8, 9, 10")]
    pub command: ::core::option::Option<ns_request::Command>,
}

/// Nested message and enum types in `NSRequest`.
pub mod ns_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Command {
        #[prost(message, tag = "3")]
        Mkdir(super::MkdirRequest),
        #[prost(message, tag = "4")]
        Rmdir(super::RmdirRequest),
        #[prost(message, tag = "5")]
        Touch(super::TouchRequest),
        #[prost(message, tag = "6")]
        Unlink(super::UnlinkRequest),
        #[prost(message, tag = "7")]
        Chown(super::ChownRequest),
        #[prost(message, tag = "8")]
        Chmod(super::ChmodRequest),
        #[prost(message, tag = "9")]
        Xattr(super::SetXAttrRequest),
        #[prost(message, tag = "10")]
        Acl(super::AclRequest),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NsResponse {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<ns_response::ErrorResponse>,
    #[prost(message, optional, tag = "2")]
    pub acl: ::core::option::Option<ns_response::AclResponse>,
}

/// Nested message and enum types in `NSResponse`.
pub mod ns_response {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ErrorResponse {
        #[prost(int64, tag = "1")]
        pub code: i64,
        #[prost(string, tag = "2")]
        pub msg: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct AclResponse {
        #[prost(int64, tag = "1")]
        pub code: i64,
        #[prost(string, tag = "2")]
        pub msg: ::prost::alloc::string::String,
        #[prost(string, tag = "3")]
        pub rule: ::prost::alloc::string::String,
    }
}

/// Generated client implementations.
pub mod eos_client {
    #![allow(unused_variables, dead_code, missing_docs, clippy::wildcard_imports)]
    use super::*;
    use tonic::codegen::*;

    /// Client for the MGM namespace service.
    #[derive(Debug, Clone)]
    pub struct EosClient<T> {
        inner: tonic::client::Grpc<T>,
    }

    impl EosClient<tonic::transport::Channel> {
        /// Attempt to create a new client by connecting to a given endpoint.
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }

    impl<T> EosClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::Error: Into<StdError>,
        T::ResponseBody: Body<Data = Bytes> + std::marker::Send + 'static,
        <T::ResponseBody as Body>::Error: Into<StdError> + std::marker::Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }

        pub async fn ping(
            &mut self,
            request: impl tonic::IntoRequest<super::PingRequest>,
        ) -> std::result::Result<tonic::Response<super::PingReply>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::unknown(format!("Service was not ready: {}", e.into()))
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/eos.rpc.Eos/Ping");
            let mut req = request.into_request();
            req.extensions_mut().insert(GrpcMethod::new("eos.rpc.Eos", "Ping"));
            self.inner.unary(req, path, codec).await
        }

        pub async fn md(
            &mut self,
            request: impl tonic::IntoRequest<super::MdRequest>,
        ) -> std::result::Result<
            tonic::Response<tonic::codec::Streaming<super::MdResponse>>,
            tonic::Status,
        > {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::unknown(format!("Service was not ready: {}", e.into()))
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/eos.rpc.Eos/MD");
            let mut req = request.into_request();
            req.extensions_mut().insert(GrpcMethod::new("eos.rpc.Eos", "MD"));
            self.inner.server_streaming(req, path, codec).await
        }

        pub async fn find(
            &mut self,
            request: impl tonic::IntoRequest<super::FindRequest>,
        ) -> std::result::Result<
            tonic::Response<tonic::codec::Streaming<super::MdResponse>>,
            tonic::Status,
        > {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::unknown(format!("Service was not ready: {}", e.into()))
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/eos.rpc.Eos/Find");
            let mut req = request.into_request();
            req.extensions_mut().insert(GrpcMethod::new("eos.rpc.Eos", "Find"));
            self.inner.server_streaming(req, path, codec).await
        }

        pub async fn exec(
            &mut self,
            request: impl tonic::IntoRequest<super::NsRequest>,
        ) -> std::result::Result<tonic::Response<super::NsResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::unknown(format!("Service was not ready: {}", e.into()))
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/eos.rpc.Eos/Exec");
            let mut req = request.into_request();
            req.extensions_mut().insert(GrpcMethod::new("eos.rpc.Eos", "Exec"));
            self.inner.unary(req, path, codec).await
        }
    }
}
