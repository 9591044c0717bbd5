/// OpenAPI documentation generation.
pub mod documentation;
/// Session lifecycle and player actions.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Ranked best scores per mode.
pub mod leaderboard_service;
/// Player display names.
pub mod profile_service;
/// Best-score persistence for finished runs.
pub mod score_service;
/// Eviction of idle game sessions.
pub mod session_sweeper;
/// Actor driving one game session.
pub mod session_worker;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events streaming service.
pub mod sse_service;
/// Score store connection supervisor toggling degraded mode.
pub mod storage_supervisor;
