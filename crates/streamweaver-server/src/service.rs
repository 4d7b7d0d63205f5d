//! Broker gRPC Service
//!
//! Implements the `StreamWeaverBroker` service over the stream service.
//! `CreateStream` reports failures in the response body (`status` +
//! `error_message`); `Publish` translates errors into gRPC status codes so
//! producers can distinguish a missing stream from a broker fault.

use bytes::Bytes;
use std::sync::Arc;
use streamweaver_hotstore::{CreateStreamParams, HotStoreError, StreamService};
use streamweaver_proto::broker::stream_weaver_broker_server::StreamWeaverBroker;
use streamweaver_proto::broker::{
    CreateStreamRequest, CreateStreamResponse, PublishRequest, PublishResponse,
};
use tonic::{Request, Response, Status};
use tracing::warn;

pub struct StreamWeaverBrokerService {
    streams: Arc<StreamService>,
}

impl StreamWeaverBrokerService {
    pub fn new(streams: Arc<StreamService>) -> Self {
        Self { streams }
    }
}

fn publish_status(err: HotStoreError) -> Status {
    match err {
        HotStoreError::StreamNotFound(name) => {
            Status::not_found(format!("Stream: {} not found", name))
        }
        HotStoreError::Validation(message) => Status::invalid_argument(message),
        other => Status::internal(other.to_string()),
    }
}

#[tonic::async_trait]
impl StreamWeaverBroker for StreamWeaverBrokerService {
    #[tracing::instrument(skip(self, request), fields(stream = %request.get_ref().stream_name))]
    async fn create_stream(
        &self,
        request: Request<CreateStreamRequest>,
    ) -> Result<Response<CreateStreamResponse>, Status> {
        let req = request.into_inner();
        let params = CreateStreamParams {
            name: req.stream_name,
            max_age_ms: (req.retention_time_ms > 0).then_some(req.retention_time_ms),
            cleanup_policy: None,
        };

        match self.streams.create_stream(params).await {
            Ok(()) => Ok(Response::new(CreateStreamResponse {
                status: "OK".to_string(),
                error_message: String::new(),
            })),
            Err(e) => {
                warn!(error = %e, "CreateStream failed");
                Ok(Response::new(CreateStreamResponse {
                    status: "ERROR".to_string(),
                    error_message: e.to_string(),
                }))
            }
        }
    }

    #[tracing::instrument(skip(self, request), fields(stream = %request.get_ref().stream_name, count = request.get_ref().messages.len()))]
    async fn publish(
        &self,
        request: Request<PublishRequest>,
    ) -> Result<Response<PublishResponse>, Status> {
        let req = request.into_inner();
        let payloads: Vec<Bytes> = req
            .messages
            .into_iter()
            .map(|m| Bytes::from(m.message_content))
            .collect();

        let result = self
            .streams
            .publish(&req.stream_name, &payloads)
            .await
            .map_err(publish_status)?;

        Ok(Response::new(PublishResponse {
            status: "OK".to_string(),
            message_ids: result.message_ids,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamweaver_hotstore::{
        CleanupPolicy, MemoryStreamBackend, RetentionDefaults, StreamMetadataService,
    };
    use streamweaver_proto::broker::PublishMessage;

    fn service() -> StreamWeaverBrokerService {
        let backend = Arc::new(MemoryStreamBackend::new());
        let metadata = Arc::new(StreamMetadataService::new(backend.clone()));
        let streams = Arc::new(StreamService::new(
            backend,
            metadata,
            RetentionDefaults {
                max_age_ms: 60_000,
                cleanup_policy: CleanupPolicy::Delete,
            },
        ));
        StreamWeaverBrokerService::new(streams)
    }

    #[tokio::test]
    async fn create_stream_then_publish() {
        let service = service();

        let response = service
            .create_stream(Request::new(CreateStreamRequest {
                stream_name: "orders".to_string(),
                retention_time_ms: 60_000,
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.status, "OK");

        let response = service
            .publish(Request::new(PublishRequest {
                stream_name: "orders".to_string(),
                messages: vec![
                    PublishMessage {
                        message_content: b"user=a amount=1".to_vec(),
                    },
                    PublishMessage {
                        message_content: b"user=b amount=2".to_vec(),
                    },
                ],
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.status, "OK");
        assert_eq!(response.message_ids.len(), 2);
    }

    #[tokio::test]
    async fn create_stream_with_empty_name_reports_error_status() {
        let service = service();
        let response = service
            .create_stream(Request::new(CreateStreamRequest {
                stream_name: String::new(),
                retention_time_ms: 0,
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.status, "ERROR");
        assert!(!response.error_message.is_empty());
    }

    #[tokio::test]
    async fn publish_to_unknown_stream_is_not_found() {
        let service = service();
        let status = service
            .publish(Request::new(PublishRequest {
                stream_name: "ghost".to_string(),
                messages: vec![PublishMessage {
                    message_content: b"k=v".to_vec(),
                }],
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::NotFound);
    }
}
