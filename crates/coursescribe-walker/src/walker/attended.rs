use crate::events::{EventSink, WalkEvent};
use crate::operator::{ManualIdentity, Operator, Prompt};
use async_trait::async_trait;
use tracing::info;

/// Announces every operator prompt on the event stream before handing it on.
pub(super) struct Attended<'a> {
    inner: &'a dyn Operator,
    events: EventSink,
}

impl<'a> Attended<'a> {
    pub(super) fn new(inner: &'a dyn Operator, events: EventSink) -> Self {
        Self { inner, events }
    }

    fn announce(&self, prompt: Prompt) {
        info!("Waiting for operator: {}", prompt);
        self.events.emit(WalkEvent::AwaitingOperator { prompt });
    }
}

#[async_trait]
impl Operator for Attended<'_> {
    async fn await_login(&self, url: &str) {
        self.announce(Prompt::Login {
            url: url.to_string(),
        });
        self.inner.await_login(url).await
    }

    async fn enable_transcript_panel(&self) -> bool {
        self.announce(Prompt::TranscriptPanel);
        self.inner.enable_transcript_panel().await
    }

    async fn identify_lecture(&self, url: &str) -> Option<ManualIdentity> {
        self.announce(Prompt::LectureIdentity {
            url: url.to_string(),
        });
        self.inner.identify_lecture(url).await
    }

    async fn navigate_manually(&self) -> bool {
        self.announce(Prompt::Navigation);
        self.inner.navigate_manually().await
    }

    async fn course_title(&self) -> Option<String> {
        self.announce(Prompt::CourseTitle);
        self.inner.course_title().await
    }
}
