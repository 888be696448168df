//! Example plugin binary exposing time tools.
//!
//! Build it, rename the binary to `time_tool.tool.plugin`, mark it
//! executable, and point a host's plugin directory at it.

use async_trait::async_trait;
use chrono::{Local, Utc};
use serde_json::{Map, Value};
use toolbelt_plugin::{
    serve, CallToolResult, PluginInfo, Property, Result, ToolName, ToolPlugin, ToolSchema,
};

const DEFAULT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

struct TimeTool;

fn str_param<'p>(params: &'p Map<String, Value>, name: &str, default: &'p str) -> &'p str {
    match params.get(name).and_then(Value::as_str) {
        Some(value) if !value.is_empty() => value,
        _ => default,
    }
}

#[async_trait]
impl ToolPlugin for TimeTool {
    async fn plugin_info(&self) -> Result<PluginInfo> {
        Ok(PluginInfo {
            name: "time_tool".to_string(),
            version: "1.0.0".to_string(),
            description: "Time formatting utilities".to_string(),
            author: "toolbelt".to_string(),
        })
    }

    async fn tools(&self) -> Result<Vec<ToolSchema>> {
        Ok(vec![ToolSchema::builder("current_time", "Returns the current time")
            .string(
                "format",
                Property::new()
                    .description("strftime format, e.g. %Y-%m-%d")
                    .default_value(DEFAULT_FORMAT),
            )
            .string(
                "timezone",
                Property::new()
                    .description("UTC or Local")
                    .enum_values(["UTC", "Local"])
                    .default_value("Local"),
            )
            .build()])
    }

    async fn call_tool(
        &self,
        tool: &ToolName,
        params: Map<String, Value>,
    ) -> Result<CallToolResult> {
        match tool.as_str() {
            "current_time" => {
                let format = str_param(&params, "format", DEFAULT_FORMAT);
                let timezone = str_param(&params, "timezone", "Local");

                let formatted = match timezone {
                    "UTC" => Utc::now().format(format).to_string(),
                    "Local" => Local::now().format(format).to_string(),
                    other => {
                        return Ok(CallToolResult::error(format!("unknown timezone: {other}")))
                    }
                };

                Ok(CallToolResult::new()
                    .add_named_text(formatted, "current_time")
                    .set_meta("timezone", timezone.into())
                    .set_meta("format", format.into()))
            }
            other => Ok(CallToolResult::error(format!("unknown tool: {other}"))),
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = serve(TimeTool).await {
        eprintln!("time plugin failed: {err}");
        std::process::exit(1);
    }
}
