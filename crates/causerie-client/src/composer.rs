//! The message composition flow: attach an image, compress it, send it
//! together with text.
//!
//! One [`Composer`] backs one input control.  Selecting a new image while
//! a compression is still running supersedes the old job, so a stale
//! payload never becomes the pending attachment.

use std::sync::{Arc, Mutex};

use causerie_media::{validate, Compressor, JobStatus};
use causerie_shared::{Message, OutgoingPayload};

use crate::engine::SyncEngine;
use crate::error::Result;
use crate::gateway::MessageGateway;

pub struct Composer<G: MessageGateway> {
    engine: SyncEngine<G>,
    compressor: Compressor,
    attachment: Arc<Mutex<Option<String>>>,
}

impl<G: MessageGateway> Composer<G> {
    pub fn new(engine: SyncEngine<G>) -> Self {
        Self {
            engine,
            compressor: Compressor::new(),
            attachment: Arc::new(Mutex::new(None)),
        }
    }

    /// Compression status of the current selection, for UI feedback.
    pub fn job_status(&self) -> JobStatus {
        self.compressor.status()
    }

    /// The prepared attachment, if any (a `data:` URL).
    pub fn attachment(&self) -> Option<String> {
        self.attachment
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn clear_attachment(&self) {
        *self.attachment.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Validate and compress a freshly selected image, then stage it as
    /// the pending attachment.
    ///
    /// Rejects non-images and inputs over 5 MiB before any decode work.
    /// If another selection arrives while this one is compressing, this
    /// call returns `Superseded` and the attachment is left untouched.
    pub async fn attach_image(&self, mime: &str, bytes: Vec<u8>) -> Result<String> {
        validate(mime, bytes.len())?;

        let job = self.compressor.spawn(mime, bytes);
        let data_url = job.finish().await?;

        *self.attachment.lock().unwrap_or_else(|e| e.into_inner()) = Some(data_url.clone());
        Ok(data_url)
    }

    /// Send the composed message (text plus staged attachment).  The
    /// attachment is cleared only once the send succeeds.
    pub async fn submit(&self, text: &str) -> Result<Message> {
        let payload = OutgoingPayload {
            text: Some(text.to_owned()),
            image: self.attachment(),
        };
        let confirmed = self.engine.send_message(payload).await?;
        self.clear_attachment();
        Ok(confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayError;
    use crate::live::LiveFeed;
    use crate::SyncError;

    use std::io::Cursor;
    use std::sync::Mutex as StdMutex;

    use causerie_media::MediaError;
    use causerie_shared::{
        ConversationId, Delivery, MessageId, ProfileRecord, UserId,
    };
    use chrono::Utc;

    #[derive(Clone, Default)]
    struct StubGateway {
        last_payload: Arc<StdMutex<Option<OutgoingPayload>>>,
    }

    impl MessageGateway for StubGateway {
        async fn fetch_history(
            &self,
            _conversation: ConversationId,
        ) -> std::result::Result<Vec<Message>, GatewayError> {
            Ok(Vec::new())
        }

        async fn send_message(
            &self,
            conversation: ConversationId,
            payload: OutgoingPayload,
        ) -> std::result::Result<Message, GatewayError> {
            *self.last_payload.lock().unwrap() = Some(payload.clone());
            Ok(Message {
                id: MessageId::new(),
                conversation_id: conversation,
                sender_id: UserId::new(),
                text: payload.text,
                image: payload.image,
                created_at: Utc::now(),
                delivery: Delivery::Confirmed,
            })
        }

        async fn upload_profile_image(
            &self,
            image_data_url: String,
        ) -> std::result::Result<ProfileRecord, GatewayError> {
            Ok(ProfileRecord {
                user_id: UserId::new(),
                display_name: "Stub".into(),
                email: "stub@example.org".into(),
                avatar: Some(image_data_url),
                created_at: Utc::now(),
            })
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 64])
        });
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    async fn engine_with_stub() -> (SyncEngine<StubGateway>, StubGateway) {
        let gateway = StubGateway::default();
        let engine = SyncEngine::new(gateway.clone(), LiveFeed::new(), UserId::new());
        engine
            .select_conversation(ConversationId::new())
            .await
            .unwrap();
        (engine, gateway)
    }

    #[tokio::test]
    async fn attach_then_submit_carries_the_image() {
        let (engine, gateway) = engine_with_stub().await;
        let composer = Composer::new(engine);

        let url = composer.attach_image("image/png", png(200, 150)).await.unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
        assert_eq!(composer.job_status(), JobStatus::Done);

        composer.submit("look at this").await.unwrap();

        let sent = gateway.last_payload.lock().unwrap().clone().unwrap();
        assert_eq!(sent.text.as_deref(), Some("look at this"));
        assert_eq!(sent.image.as_deref(), Some(url.as_str()));

        // The staged attachment is consumed by a successful send.
        assert!(composer.attachment().is_none());
    }

    #[tokio::test]
    async fn non_image_selection_is_rejected_before_compression() {
        let (engine, _) = engine_with_stub().await;
        let composer = Composer::new(engine);

        let err = composer
            .attach_image("application/zip", vec![0u8; 16])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::Media(MediaError::NotAnImage { .. })
        ));
        assert!(composer.attachment().is_none());
    }

    #[tokio::test]
    async fn newer_selection_supersedes_the_inflight_one() {
        let (engine, _) = engine_with_stub().await;
        let composer = Arc::new(Composer::new(engine));

        // A large image keeps the first job busy long enough for the
        // second selection to land.
        let slow = Arc::clone(&composer);
        let first = tokio::spawn(async move {
            slow.attach_image("image/png", png(1800, 1400)).await
        });
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let second = composer.attach_image("image/png", png(64, 64)).await;
        assert!(second.is_ok());

        match first.await.unwrap() {
            Err(SyncError::Media(MediaError::Superseded)) => {
                // The stale result never replaced the staged attachment.
                assert_eq!(composer.attachment(), second.ok());
            }
            Ok(_) => {
                // The first job won the race outright; the second
                // selection then replaced it, which is also fine.
                assert!(composer.attachment().is_some());
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn submit_without_attachment_sends_text_only() {
        let (engine, gateway) = engine_with_stub().await;
        let composer = Composer::new(engine);

        composer.submit("just words").await.unwrap();
        let sent = gateway.last_payload.lock().unwrap().clone().unwrap();
        assert_eq!(sent.text.as_deref(), Some("just words"));
        assert!(sent.image.is_none());
    }
}
