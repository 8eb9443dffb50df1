//! `track.v1` messages and service glue, generated from
//! `proto/track/v1/track.proto` with prost-build 0.12 / tonic-build 0.11 and
//! checked in so that building needs no `protoc`. Regenerate after editing
//! the `.proto` file. Conversions to the domain types are at the bottom.

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Mask {
    #[prost(string, tag = "1")]
    pub coco_encoded_rle: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub size: ::core::option::Option<mask::Size>,
}
/// Nested message and enum types in `Mask`.
pub mod mask {
    #[allow(clippy::derive_partial_eq_without_eq)]
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Size {
        #[prost(uint32, tag = "1")]
        pub width: u32,
        #[prost(uint32, tag = "2")]
        pub height: u32,
    }
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TrackRequest {
    #[prost(string, tag = "1")]
    pub first_image_uri: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub first_image_mask: ::core::option::Option<Mask>,
    #[prost(string, repeated, tag = "3")]
    pub subsequent_image_uris: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TrackResponse {
    #[prost(message, repeated, tag = "1")]
    pub subsequent_image_masks: ::prost::alloc::vec::Vec<Mask>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FrameMask {
    #[prost(uint32, tag = "1")]
    pub frame_index: u32,
    #[prost(message, optional, tag = "2")]
    pub mask: ::core::option::Option<Mask>,
}
/// Generated client implementations.
pub mod track_service_client {
    #![allow(unused_variables, dead_code, missing_docs, clippy::let_unit_value)]
    use tonic::codegen::*;
    #[derive(Debug, Clone)]
    pub struct TrackServiceClient<T> {
        inner: tonic::client::Grpc<T>,
    }
    impl TrackServiceClient<tonic::transport::Channel> {
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
    impl<T> TrackServiceClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::Error: Into<StdError>,
        T::ResponseBody: Body<Data = Bytes> + Send + 'static,
        <T::ResponseBody as Body>::Error: Into<StdError> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }
        /// Limits the maximum size of a decoded message.
        ///
        /// Default: `4MB`
        #[must_use]
        pub fn max_decoding_message_size(mut self, limit: usize) -> Self {
            self.inner = self.inner.max_decoding_message_size(limit);
            self
        }
        /// Limits the maximum size of an encoded message.
        ///
        /// Default: `usize::MAX`
        #[must_use]
        pub fn max_encoding_message_size(mut self, limit: usize) -> Self {
            self.inner = self.inner.max_encoding_message_size(limit);
            self
        }
        pub async fn track(
            &mut self,
            request: impl tonic::IntoRequest<super::TrackRequest>,
        ) -> std::result::Result<tonic::Response<super::TrackResponse>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/track.v1.TrackService/Track",
            );
            let req = request.into_request();
            self.inner.unary(req, path, codec).await
        }
        pub async fn track_stream(
            &mut self,
            request: impl tonic::IntoRequest<super::TrackRequest>,
        ) -> std::result::Result<
            tonic::Response<tonic::codec::Streaming<super::FrameMask>>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/track.v1.TrackService/TrackStream",
            );
            let req = request.into_request();
            self.inner.server_streaming(req, path, codec).await
        }
    }
}
/// Generated server implementations.
pub mod track_service_server {
    #![allow(unused_variables, dead_code, missing_docs, clippy::let_unit_value)]
    use tonic::codegen::*;
    /// Generated trait containing gRPC methods that should be implemented for use with TrackServiceServer.
    #[async_trait]
    pub trait TrackService: Send + Sync + 'static {
        async fn track(
            &self,
            request: tonic::Request<super::TrackRequest>,
        ) -> std::result::Result<tonic::Response<super::TrackResponse>, tonic::Status>;
        /// Server streaming response type for the TrackStream method.
        type TrackStreamStream: tonic::codegen::tokio_stream::Stream<
                Item = std::result::Result<super::FrameMask, tonic::Status>,
            >
            + Send
            + 'static;
        async fn track_stream(
            &self,
            request: tonic::Request<super::TrackRequest>,
        ) -> std::result::Result<
            tonic::Response<Self::TrackStreamStream>,
            tonic::Status,
        >;
    }
    #[derive(Debug)]
    pub struct TrackServiceServer<T: TrackService> {
        inner: _Inner<T>,
        accept_compression_encodings: EnabledCompressionEncodings,
        send_compression_encodings: EnabledCompressionEncodings,
        max_decoding_message_size: Option<usize>,
        max_encoding_message_size: Option<usize>,
    }
    struct _Inner<T>(Arc<T>);
    impl<T: TrackService> TrackServiceServer<T> {
        pub fn new(inner: T) -> Self {
            Self::from_arc(Arc::new(inner))
        }
        pub fn from_arc(inner: Arc<T>) -> Self {
            let inner = _Inner(inner);
            Self {
                inner,
                accept_compression_encodings: Default::default(),
                send_compression_encodings: Default::default(),
                max_decoding_message_size: None,
                max_encoding_message_size: None,
            }
        }
        pub fn with_interceptor<F>(
            inner: T,
            interceptor: F,
        ) -> InterceptedService<Self, F>
        where
            F: tonic::service::Interceptor,
        {
            InterceptedService::new(Self::new(inner), interceptor)
        }
        /// Enable decompressing requests with the given encoding.
        #[must_use]
        pub fn accept_compressed(mut self, encoding: CompressionEncoding) -> Self {
            self.accept_compression_encodings.enable(encoding);
            self
        }
        /// Compress responses with the given encoding, if the client supports it.
        #[must_use]
        pub fn send_compressed(mut self, encoding: CompressionEncoding) -> Self {
            self.send_compression_encodings.enable(encoding);
            self
        }
        /// Limits the maximum size of a decoded message.
        ///
        /// Default: `4MB`
        #[must_use]
        pub fn max_decoding_message_size(mut self, limit: usize) -> Self {
            self.max_decoding_message_size = Some(limit);
            self
        }
        /// Limits the maximum size of an encoded message.
        ///
        /// Default: `usize::MAX`
        #[must_use]
        pub fn max_encoding_message_size(mut self, limit: usize) -> Self {
            self.max_encoding_message_size = Some(limit);
            self
        }
    }
    impl<T, B> tonic::codegen::Service<http::Request<B>> for TrackServiceServer<T>
    where
        T: TrackService,
        B: Body + Send + 'static,
        B::Error: Into<StdError> + Send + 'static,
    {
        type Response = http::Response<tonic::body::BoxBody>;
        type Error = std::convert::Infallible;
        type Future = BoxFuture<Self::Response, Self::Error>;
        fn poll_ready(
            &mut self,
            _cx: &mut Context<'_>,
        ) -> Poll<std::result::Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }
        fn call(&mut self, req: http::Request<B>) -> Self::Future {
            let inner = self.inner.clone();
            match req.uri().path() {
                "/track.v1.TrackService/Track" => {
                    #[allow(non_camel_case_types)]
                    struct TrackSvc<T: TrackService>(pub Arc<T>);
                    impl<
                        T: TrackService,
                    > tonic::server::UnaryService<super::TrackRequest> for TrackSvc<T> {
                        type Response = super::TrackResponse;
                        type Future = BoxFuture<
                            tonic::Response<Self::Response>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::TrackRequest>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as TrackService>::track(&inner, request).await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = TrackSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/track.v1.TrackService/TrackStream" => {
                    #[allow(non_camel_case_types)]
                    struct TrackStreamSvc<T: TrackService>(pub Arc<T>);
                    impl<
                        T: TrackService,
                    > tonic::server::ServerStreamingService<super::TrackRequest>
                    for TrackStreamSvc<T> {
                        type Response = super::FrameMask;
                        type ResponseStream = T::TrackStreamStream;
                        type Future = BoxFuture<
                            tonic::Response<Self::ResponseStream>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::TrackRequest>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as TrackService>::track_stream(&inner, request).await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = TrackStreamSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.server_streaming(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                _ => {
                    Box::pin(async move {
                        Ok(
                            http::Response::builder()
                                .status(200)
                                .header("grpc-status", "12")
                                .header("content-type", "application/grpc")
                                .body(empty_body())
                                .unwrap(),
                        )
                    })
                }
            }
        }
    }
    impl<T: TrackService> Clone for TrackServiceServer<T> {
        fn clone(&self) -> Self {
            let inner = self.inner.clone();
            Self {
                inner,
                accept_compression_encodings: self.accept_compression_encodings,
                send_compression_encodings: self.send_compression_encodings,
                max_decoding_message_size: self.max_decoding_message_size,
                max_encoding_message_size: self.max_encoding_message_size,
            }
        }
    }
    impl<T: TrackService> Clone for _Inner<T> {
        fn clone(&self) -> Self {
            Self(Arc::clone(&self.0))
        }
    }
    impl<T: std::fmt::Debug> std::fmt::Debug for _Inner<T> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self.0)
        }
    }
    impl<T: TrackService> tonic::server::NamedService for TrackServiceServer<T> {
        const NAME: &'static str = "track.v1.TrackService";
    }
}

impl From<framewise_core::Mask> for Mask {
    fn from(mask: framewise_core::Mask) -> Self {
        Self {
            coco_encoded_rle: mask.coco_encoded_rle,
            size: Some(mask::Size {
                width: mask.size.width,
                height: mask.size.height,
            }),
        }
    }
}

/// A missing size decodes as 0x0, which only an empty RLE string satisfies.
impl From<Mask> for framewise_core::Mask {
    fn from(mask: Mask) -> Self {
        let size = mask.size.unwrap_or_default();
        framewise_core::Mask::new(
            mask.coco_encoded_rle,
            framewise_core::MaskSize::new(size.width, size.height),
        )
    }
}

impl From<framewise_track::FrameMask> for FrameMask {
    fn from(frame: framewise_track::FrameMask) -> Self {
        Self {
            frame_index: frame.frame_index,
            mask: Some(frame.mask.into()),
        }
    }
}
