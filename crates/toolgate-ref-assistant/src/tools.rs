//! Simulated tool bodies for the reference deployment.
//!
//! All data in this module is fictional. No external systems are contacted;
//! each body returns the JSON a real integration might produce.

use chrono::Utc;
use serde_json::{json, Value};

use crate::runner::ToolRunner;

/// Register every mock body with `runner`.
pub fn register_all(runner: &mut ToolRunner) {
    runner.register("time.now", time_now);
    runner.register("agent.status", agent_status);
    runner.register("fs.read", fs_read);
    runner.register("calendar.create_event", calendar_create_event);
    runner.register("email.send", email_send);
    runner.register("web.fetch", web_fetch);
    runner.register("payments.transfer", payments_transfer);
    runner.register("shell.exec", shell_exec);
}

pub fn time_now(args: &Value) -> Value {
    json!({
        "now": Utc::now().to_rfc3339(),
        "timezone": args["timezone"].as_str().unwrap_or("UTC"),
    })
}

pub fn agent_status(_args: &Value) -> Value {
    json!({ "status": "ready" })
}

pub fn fs_read(args: &Value) -> Value {
    let path = args["path"].as_str().unwrap_or_default();
    let content = match path {
        "/home/user/notes/todo.txt" => "- renew passport\n- book dentist",
        "/home/user/notes/groceries.txt" => "eggs, rice, lemons",
        _ => "",
    };
    json!({ "path": path, "bytes": content.len(), "content": content })
}

pub fn calendar_create_event(args: &Value) -> Value {
    json!({
        "event_id": format!("evt-{}", short_id()),
        "calendar_id": args["calendar_id"],
        "title": args["title"],
        "start": args["start"],
    })
}

pub fn email_send(args: &Value) -> Value {
    json!({
        "message_id": format!("<{}@mail.example.com>", short_id()),
        "to": args["to"],
        "queued": true,
    })
}

pub fn web_fetch(args: &Value) -> Value {
    json!({ "url": args["url"], "status": 200, "title": "Example Domain" })
}

pub fn payments_transfer(args: &Value) -> Value {
    json!({
        "transfer_id": format!("tx-{}", short_id()),
        "to_account": args["to_account"],
        "amount_cents": args["amount_cents"],
        "state": "settled",
    })
}

pub fn shell_exec(_args: &Value) -> Value {
    json!({ "exit_code": 0, "stdout": "" })
}

fn short_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..12].to_string()
}
