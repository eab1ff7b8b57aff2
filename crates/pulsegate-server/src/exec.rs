//! One-shot command mode
//!
//! `pulsegate-server exec <command> [json]` runs a single operation against the
//! same sync service the HTTP endpoints use and prints its JSON result.

use pulsegate_ingress::Envelope;
use pulsegate_ingress::types::{
    AuthRequest, DateRequest, RangeRequest, UserRequest, parse_lenient,
};
use pulsegate_sync::SyncService;
use serde::Serialize;
use serde_json::{Value, json};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Authenticate,
    CheckAuth,
    FetchSleep,
    FetchActivity,
    FetchStress,
    FetchBodyBattery,
    FetchHeartRate,
    FetchActivities,
    FetchActivitiesBatch,
    SyncAll,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommand(pub String);

impl UnknownCommand {
    /// Body printed for an unrecognized command
    pub fn to_json(&self) -> Value {
        json!({ "error": format!("Unknown command: {}", self.0) })
    }
}

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "authenticate" => Self::Authenticate,
            "check_auth" => Self::CheckAuth,
            "fetch_sleep" => Self::FetchSleep,
            "fetch_activity" => Self::FetchActivity,
            "fetch_stress" => Self::FetchStress,
            "fetch_body_battery" => Self::FetchBodyBattery,
            "fetch_heart_rate" => Self::FetchHeartRate,
            "fetch_activities" => Self::FetchActivities,
            "fetch_activities_batch" => Self::FetchActivitiesBatch,
            "sync_all" => Self::SyncAll,
            other => return Err(UnknownCommand(other.to_string())),
        })
    }
}

/// Run one command; `args` is the raw JSON argument (may be empty)
pub async fn execute(
    sync: &SyncService,
    command: Command,
    args: &[u8],
) -> serde_json::Result<Value> {
    match command {
        Command::Authenticate => {
            let req: AuthRequest = parse_lenient(args);
            to_json(sync.authenticate(&req.email, &req.password, req.user_id()).await)
        }
        Command::CheckAuth => {
            let req: UserRequest = parse_lenient(args);
            to_json(sync.check_auth(req.user_id()).await)
        }
        Command::FetchSleep => {
            let req: DateRequest = parse_lenient(args);
            to_json(Envelope::data(sync.sleep(&req.date, req.user_id()).await))
        }
        Command::FetchActivity => {
            let req: DateRequest = parse_lenient(args);
            to_json(Envelope::data(
                sync.activity_summary(&req.date, req.user_id()).await,
            ))
        }
        Command::FetchStress => {
            let req: DateRequest = parse_lenient(args);
            to_json(Envelope::data(sync.stress(&req.date, req.user_id()).await))
        }
        Command::FetchBodyBattery => {
            let req: DateRequest = parse_lenient(args);
            to_json(Envelope::data(sync.body_battery(&req.date, req.user_id()).await))
        }
        Command::FetchHeartRate => {
            let req: DateRequest = parse_lenient(args);
            to_json(Envelope::data(sync.heart_rate(&req.date, req.user_id()).await))
        }
        Command::FetchActivities => {
            let req: DateRequest = parse_lenient(args);
            to_json(Envelope::data(sync.activities(&req.date, req.user_id()).await))
        }
        Command::FetchActivitiesBatch => {
            let req: RangeRequest = parse_lenient(args);
            to_json(Envelope::data(
                sync.activities_batch(&req.start_date, &req.end_date, req.user_id())
                    .await,
            ))
        }
        Command::SyncAll => {
            let req: RangeRequest = parse_lenient(args);
            to_json(Envelope::dates(
                sync.sync_all(&req.start_date, &req.end_date, req.user_id())
                    .await,
            ))
        }
    }
}

fn to_json(value: impl Serialize) -> serde_json::Result<Value> {
    serde_json::to_value(value)
}
