use std::path::Path;
use std::sync::RwLock;

use anyhow::{Context, Result};
use reqwest::blocking::multipart::Form;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::dto::{
    ApiResponse, Created, EventList, LoginRequest, LoginResponse, RaffleRequest, SubEventRequest,
};
use super::{Backend, ImageKind};
use crate::error::ApiError;
use crate::models::event::{Event, EventDraft, EventFilter, EventId, SubEventDraft, SubEventId};
use crate::models::raffle::{PrizeDraft, PrizeId, RaffleDraft, RaffleId};
use crate::models::settings::ApiSettings;

/// Blocking client for the admin API.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    auth_url: String,
    token: RwLock<Option<String>>,
}

impl HttpBackend {
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .context("Failed to build admin API HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            auth_url: settings.auth_url.clone(),
            token: RwLock::new(None),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn store_token(&self, token: Option<String>) {
        *self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = token;
    }

    fn execute(&self, request: RequestBuilder, what: &str) -> Result<Response, ApiError> {
        let request = match self.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        log::debug!("Admin API: {}", what);
        let response = request.send().map_err(|err| {
            log::warn!("Admin API {} failed: {}", what, err);
            ApiError::Network(err.to_string())
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            log::warn!("Admin API {} answered 401", what);
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let err = error_from_body(status, &body);
            log::warn!("Admin API {} failed: {}", what, err);
            return Err(err);
        }

        Ok(response)
    }

    fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<ApiResponse<T>, ApiError> {
        let response = self.execute(request, what)?;
        let body = response
            .text()
            .map_err(|err| ApiError::Network(err.to_string()))?;
        serde_json::from_str(&body).map_err(|err| ApiError::Decode(format!("{what}: {err}")))
    }

    fn send_action(&self, request: RequestBuilder, what: &str) -> Result<(), ApiError> {
        self.send::<serde_json::Value>(request, what)?
            .into_result()
            .map(|_| ())
    }

    fn send_created(&self, request: RequestBuilder, what: &str) -> Result<String, ApiError> {
        let created: Created = self.send(request, what)?.into_data()?;
        Ok(created.id.into())
    }
}

impl Backend for HttpBackend {
    fn login(&self, email: &str, password: &str) -> Result<String, ApiError> {
        let request = self
            .client
            .post(&self.auth_url)
            .json(&LoginRequest { email, password });

        // The auth endpoint answers with a bare `{token}`.
        let response = self.execute(request, "login")?;
        let body = response
            .text()
            .map_err(|err| ApiError::Network(err.to_string()))?;
        let login: LoginResponse =
            serde_json::from_str(&body).map_err(|err| ApiError::Decode(format!("login: {err}")))?;

        self.store_token(Some(login.token.clone()));
        log::info!("Signed in as {}", email);
        Ok(login.token)
    }

    fn set_token(&self, token: Option<String>) {
        self.store_token(token);
    }

    fn sign_out(&self) {
        self.store_token(None);
    }

    fn list_events(&self, filter: EventFilter) -> Result<Vec<Event>, ApiError> {
        let mut request = self.client.get(self.endpoint(&["list"]));
        if let Some(kind) = filter.list_query() {
            request = request.query(&[("type", kind)]);
        }

        let list: EventList = self.send(request, "list events")?.into_data()?;
        Ok(list.into_events())
    }

    fn get_event(&self, id: &EventId) -> Result<Event, ApiError> {
        let request = self.client.get(self.endpoint(&[id.as_str()]));
        self.send(request, "get event")?.into_data()
    }

    fn create_event(&self, draft: &EventDraft) -> Result<EventId, ApiError> {
        let form = event_form(draft)?;
        let request = self.client.post(self.endpoint(&["create"])).multipart(form);
        self.send_created(request, "create event").map(EventId::new)
    }

    fn update_event(&self, id: &EventId, draft: &EventDraft) -> Result<(), ApiError> {
        let form = event_form(draft)?;
        let request = self.client.put(self.endpoint(&[id.as_str()])).multipart(form);
        self.send_action(request, "update event")
    }

    fn create_sub_event(
        &self,
        event_id: &EventId,
        draft: &SubEventDraft,
    ) -> Result<SubEventId, ApiError> {
        let request = self
            .client
            .post(self.endpoint(&[event_id.as_str(), "sub-events"]))
            .json(&SubEventRequest::from(draft));
        self.send_created(request, "create sub-event")
            .map(SubEventId::new)
    }

    fn update_sub_event(
        &self,
        event_id: &EventId,
        sub_event_id: &SubEventId,
        draft: &SubEventDraft,
    ) -> Result<(), ApiError> {
        let request = self
            .client
            .put(self.endpoint(&[event_id.as_str(), "sub-events", sub_event_id.as_str()]))
            .json(&SubEventRequest::from(draft));
        self.send_action(request, "update sub-event")
    }

    fn delete_sub_event(
        &self,
        event_id: &EventId,
        sub_event_id: &SubEventId,
    ) -> Result<(), ApiError> {
        let request = self.client.delete(self.endpoint(&[
            event_id.as_str(),
            "sub-events",
            sub_event_id.as_str(),
        ]));
        self.send_action(request, "delete sub-event")
    }

    fn create_raffle(&self, event_id: &EventId, draft: &RaffleDraft) -> Result<RaffleId, ApiError> {
        let request = self
            .client
            .post(self.endpoint(&[event_id.as_str(), "raffles"]))
            .json(&RaffleRequest::from(draft));
        self.send_created(request, "create raffle").map(RaffleId::new)
    }

    fn update_raffle(
        &self,
        event_id: &EventId,
        raffle_id: &RaffleId,
        draft: &RaffleDraft,
    ) -> Result<(), ApiError> {
        let request = self
            .client
            .put(self.endpoint(&[event_id.as_str(), "raffles", raffle_id.as_str()]))
            .json(&RaffleRequest::from(draft));
        self.send_action(request, "update raffle")
    }

    fn delete_raffle(&self, event_id: &EventId, raffle_id: &RaffleId) -> Result<(), ApiError> {
        let request = self.client.delete(self.endpoint(&[
            event_id.as_str(),
            "raffles",
            raffle_id.as_str(),
        ]));
        self.send_action(request, "delete raffle")
    }

    fn create_prize(
        &self,
        event_id: &EventId,
        raffle_id: &RaffleId,
        draft: &PrizeDraft,
    ) -> Result<PrizeId, ApiError> {
        let form = prize_form(draft)?;
        let request = self
            .client
            .post(self.endpoint(&[event_id.as_str(), "raffles", raffle_id.as_str(), "prizes"]))
            .multipart(form);
        self.send_created(request, "create prize").map(PrizeId::new)
    }

    fn update_prize(
        &self,
        event_id: &EventId,
        raffle_id: &RaffleId,
        prize_id: &PrizeId,
        draft: &PrizeDraft,
    ) -> Result<(), ApiError> {
        let form = prize_form(draft)?;
        let request = self
            .client
            .put(self.endpoint(&[
                event_id.as_str(),
                "raffles",
                raffle_id.as_str(),
                "prizes",
                prize_id.as_str(),
            ]))
            .multipart(form);
        self.send_action(request, "update prize")
    }

    fn delete_prize(
        &self,
        event_id: &EventId,
        raffle_id: &RaffleId,
        prize_id: &PrizeId,
    ) -> Result<(), ApiError> {
        let request = self.client.delete(self.endpoint(&[
            event_id.as_str(),
            "raffles",
            raffle_id.as_str(),
            "prizes",
            prize_id.as_str(),
        ]));
        self.send_action(request, "delete prize")
    }

    fn start_event(&self, id: &EventId) -> Result<(), ApiError> {
        let request = self.client.post(self.endpoint(&[id.as_str(), "start"]));
        self.send_action(request, "start event")
    }

    fn end_event(&self, id: &EventId) -> Result<(), ApiError> {
        let request = self.client.post(self.endpoint(&[id.as_str(), "end"]));
        self.send_action(request, "end event")
    }

    fn start_raffle(&self, event_id: &EventId, raffle_id: &RaffleId) -> Result<(), ApiError> {
        let request = self.client.post(self.endpoint(&[
            event_id.as_str(),
            "raffles",
            raffle_id.as_str(),
            "start",
        ]));
        self.send_action(request, "start raffle")
    }

    fn fetch_image(&self, kind: ImageKind, name: &str) -> Result<Vec<u8>, ApiError> {
        let request = self
            .client
            .get(self.endpoint(&["image"]))
            .query(&[("type", kind.as_str()), ("name", name)]);
        let response = self.execute(request, "fetch image")?;
        let bytes = response
            .bytes()
            .map_err(|err| ApiError::Network(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

fn event_form(draft: &EventDraft) -> Result<Form, ApiError> {
    let mut form = Form::new()
        .text("name", draft.name.trim().to_string())
        .text(
            "date",
            draft
                .date
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        )
        .text("startTime", draft.start_time.trim().to_string())
        .text("endTime", draft.end_time.trim().to_string())
        .text("shortDescription", draft.short_description.trim().to_string())
        .text("description", draft.description.trim().to_string())
        .text("address", draft.address.trim().to_string());

    if let Some(cover) = &draft.cover {
        form = attach(form, "image", cover)?;
    }
    Ok(form)
}

fn prize_form(draft: &PrizeDraft) -> Result<Form, ApiError> {
    let form = Form::new().text("name", draft.name.trim().to_string());
    match &draft.image {
        Some(image) => attach(form, "image", image),
        None => Ok(form),
    }
}

fn attach(form: Form, field: &'static str, path: &Path) -> Result<Form, ApiError> {
    form.file(field, path).map_err(|err| ApiError::Attachment {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

/// Maps a non-2xx answer. A body carrying field errors is a rejection, not a
/// transport failure.
fn error_from_body(status: StatusCode, body: &str) -> ApiError {
    let envelope = serde_json::from_str::<ApiResponse<serde_json::Value>>(body).ok();

    match envelope {
        Some(envelope) if !envelope.errors.is_empty() => ApiError::Rejected {
            message: envelope.message,
            errors: envelope.errors,
        },
        Some(ApiResponse {
            message: Some(message),
            ..
        }) => ApiError::Request {
            status: status.as_u16(),
            message,
        },
        _ => ApiError::Request {
            status: status.as_u16(),
            message: status
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_string(),
        },
    }
}
