//! Stateless conversions from stored records to public representations

use crate::types::{Event, EventFullDto, EventShortDto, ParticipationRequest, ParticipationRequestDto};

pub fn request_to_dto(request: &ParticipationRequest) -> ParticipationRequestDto {
    ParticipationRequestDto {
        id: request.id,
        created: request.created,
        event: request.event,
        requester: request.requester,
        status: request.status,
    }
}

pub fn requests_to_dtos(requests: &[ParticipationRequest]) -> Vec<ParticipationRequestDto> {
    requests.iter().map(request_to_dto).collect()
}

pub fn event_to_full(event: &Event, confirmed_requests: u64, views: u64) -> EventFullDto {
    EventFullDto {
        id: event.id,
        title: event.title.clone(),
        annotation: event.annotation.clone(),
        description: event.description.clone(),
        category: event.category,
        location: event.location,
        paid: event.paid,
        event_date: event.event_date,
        participant_limit: event.participant_limit,
        request_moderation: event.request_moderation,
        initiator: event.initiator,
        state: event.state,
        created_on: event.created_on,
        published_on: event.published_on,
        confirmed_requests,
        views,
    }
}

pub fn event_to_short(event: &Event, confirmed_requests: u64, views: u64) -> EventShortDto {
    EventShortDto {
        id: event.id,
        title: event.title.clone(),
        annotation: event.annotation.clone(),
        category: event.category,
        event_date: event.event_date,
        initiator: event.initiator,
        paid: event.paid,
        confirmed_requests,
        views,
    }
}
