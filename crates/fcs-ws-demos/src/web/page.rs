/*
[INPUT]:  Page context (title, key, symbols, timeframe, script source, preset)
[OUTPUT]: Rendered dashboard HTML
[POS]:    Web layer - server-side page rendering shared by both servers
[UPDATE]: When changing the template placeholders or card markup
*/

use std::fmt::Write as _;

use serde_json::json;

use crate::config::{DemoConfig, Preset};
use crate::format::split_symbol;

pub const DASHBOARD_TEMPLATE: &str = include_str!("../../assets/dashboard.html");
pub const CLIENT_LIB_JS: &str = include_str!("../../assets/fcs-client-lib.js");

pub const CDN_SCRIPT_SRC: &str = "https://cdn.jsdelivr.net/gh/fcsapi/websocket-python/fcs-client-lib.js";
pub const LOCAL_SCRIPT_SRC: &str = "/fcs-client-lib.js";

pub const TIMEFRAME_OPTIONS: [(&str, &str); 5] = [
    ("1", "1 Min"),
    ("5", "5 Min"),
    ("15", "15 Min"),
    ("1H", "1 Hour"),
    ("1D", "1 Day"),
];

#[derive(Debug, Clone)]
pub struct PageContext {
    pub title: String,
    pub subtitle: String,
    pub api_key: String,
    pub symbols: Vec<String>,
    pub timeframe: String,
    pub script_src: String,
    pub style: Preset,
}

impl PageContext {
    pub fn from_config(config: &DemoConfig, subtitle: &str, script_src: &str) -> Self {
        Self {
            title: format!("Real-time {} Prices", config.preset.title()),
            subtitle: subtitle.to_string(),
            api_key: config.api_key.clone(),
            symbols: config.resolved_symbols(),
            timeframe: config.resolved_timeframe(),
            script_src: script_src.to_string(),
            style: config.preset,
        }
    }
}

pub fn render_page(ctx: &PageContext) -> String {
    fill_template(DASHBOARD_TEMPLATE, |name| match name {
        "title" => Some(escape_html(&ctx.title)),
        "subtitle" => Some(escape_html(&ctx.subtitle)),
        "style" => Some(style_class(ctx.style).to_string()),
        "script_src" => Some(escape_html(&ctx.script_src)),
        "timeframe_options" => Some(render_timeframe_options(&ctx.timeframe)),
        "cards" => Some(render_cards(ctx)),
        "api_key_json" => Some(script_json(&json!(ctx.api_key))),
        "symbols_json" => Some(script_json(&json!(ctx.symbols))),
        "timeframe_json" => Some(script_json(&json!(ctx.timeframe))),
        "currency_json" => Some(script_json(&json!(currency(ctx.style)))),
        "price_decimals" => Some(price_decimals(ctx.style).to_string()),
        _ => None,
    })
}

/// Element id fragment for a symbol, `FX:EURUSD` -> `FX-EURUSD`.
pub fn symbol_id(symbol: &str) -> String {
    symbol.replace(':', "-")
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// JSON literal safe to embed inside a `<script>` block.
pub fn script_json(value: &serde_json::Value) -> String {
    value.to_string().replace('<', "\\u003c")
}

/// Single pass over `{{name}}` markers. Unknown markers are left as-is.
fn fill_template(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len() * 2);
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push_str("{{");
                        out.push_str(name);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn style_class(preset: Preset) -> &'static str {
    match preset {
        Preset::Stock => "stock",
        Preset::Forex => "forex",
        Preset::Crypto => "crypto",
    }
}

fn currency(preset: Preset) -> &'static str {
    match preset {
        Preset::Forex => "",
        Preset::Stock | Preset::Crypto => "$",
    }
}

fn price_decimals(preset: Preset) -> u32 {
    match preset {
        Preset::Forex => 5,
        Preset::Stock | Preset::Crypto => 2,
    }
}

fn render_timeframe_options(selected: &str) -> String {
    let mut out = String::new();
    let mut matched = false;
    for (value, label) in TIMEFRAME_OPTIONS {
        let is_selected = value == selected;
        matched |= is_selected;
        let _ = writeln!(
            out,
            "                    <option value=\"{value}\"{}>{label}</option>",
            if is_selected { " selected" } else { "" }
        );
    }
    if !matched {
        let value = escape_html(selected);
        let _ = writeln!(
            out,
            "                    <option value=\"{value}\" selected>{value}</option>"
        );
    }
    out
}

fn render_cards(ctx: &PageContext) -> String {
    let mut out = String::new();
    let timeframe = escape_html(&ctx.timeframe);
    for symbol in &ctx.symbols {
        let id = escape_html(&symbol_id(symbol));
        let (exchange, ticker) = split_symbol(symbol);
        let ticker = escape_html(ticker);
        let exchange = escape_html(exchange);
        let placeholder = format!("{}--", currency(ctx.style));

        let _ = writeln!(out, "            <div class=\"card\" id=\"card-{id}\">");
        let _ = writeln!(out, "                <div class=\"card-header\">");
        let _ = writeln!(out, "                    <div class=\"symbol-info\">");
        let _ = writeln!(out, "                        <span class=\"symbol\">{ticker}</span>");
        if ctx.style == Preset::Stock {
            let _ = writeln!(out, "                        <span class=\"exchange\">{exchange}</span>");
        }
        let _ = writeln!(out, "                    </div>");
        let _ = writeln!(
            out,
            "                    <span class=\"timeframe\" id=\"tf-{id}\">{timeframe}</span>"
        );
        let _ = writeln!(out, "                </div>");
        let _ = writeln!(out, "                <div class=\"price\" id=\"price-{id}\">{placeholder}</div>");

        if ctx.style != Preset::Forex {
            let _ = writeln!(out, "                <div class=\"volume\" id=\"vol-{id}\">Volume: --</div>");
            let _ = writeln!(out, "                <div class=\"ohlc\">");
            for (label, key) in [("Open", "open"), ("High", "high"), ("Low", "low"), ("Close", "close")] {
                let _ = writeln!(
                    out,
                    "                    <div class=\"ohlc-item\"><div class=\"ohlc-label\">{label}</div><div class=\"ohlc-value\" id=\"{key}-{id}\">--</div></div>"
                );
            }
            let _ = writeln!(out, "                </div>");
        }

        let _ = writeln!(out, "                <div class=\"spread\">");
        for (label, key) in [("ASK", "ask"), ("BID", "bid")] {
            let _ = writeln!(
                out,
                "                    <div class=\"spread-item\"><div class=\"spread-label\">{label}</div><div class=\"spread-value {key}\" id=\"{key}-{id}\">--</div></div>"
            );
        }
        let _ = writeln!(out, "                </div>");
        let _ = writeln!(out, "            </div>");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forex_page() -> PageContext {
        PageContext::from_config(&DemoConfig::for_preset(Preset::Forex), "axum demo", CDN_SCRIPT_SRC)
    }

    #[test]
    fn page_contains_cards_and_script_values() {
        let html = render_page(&forex_page());

        assert!(html.contains("<title>Real-time Forex Prices</title>"));
        assert!(html.contains(&format!("<script src=\"{CDN_SCRIPT_SRC}\"></script>")));
        assert!(html.contains("id=\"price-FX-EURUSD\""));
        assert!(html.contains("id=\"tf-FX-USDJPY\">1D</span>"));
        assert!(html.contains("const apiKey = \"fcs_socket_demo\";"));
        assert!(html.contains(r#"const symbols = ["FX:EURUSD","FX:GBPUSD","FX:USDJPY","FX:AUDUSD"];"#));
        assert!(html.contains("<option value=\"1D\" selected>1 Day</option>"));
        assert!(html.contains("<body class=\"forex\">"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn stock_cards_show_exchange_and_ohlc() {
        let ctx = PageContext::from_config(&DemoConfig::for_preset(Preset::Stock), "raw", LOCAL_SCRIPT_SRC);
        let html = render_page(&ctx);
        assert!(html.contains("<span class=\"exchange\">NASDAQ</span>"));
        assert!(html.contains("id=\"open-NYSE-TSLA\""));
        assert!(html.contains("<script src=\"/fcs-client-lib.js\"></script>"));
    }

    #[test]
    fn injected_values_are_escaped() {
        let mut ctx = forex_page();
        ctx.title = "<b>Quotes</b> & more".to_string();
        ctx.api_key = "</script><script>alert(1)</script>".to_string();
        ctx.symbols = vec!["FX:<EUR>".to_string()];

        let html = render_page(&ctx);
        assert!(html.contains("&lt;b&gt;Quotes&lt;/b&gt; &amp; more"));
        assert!(!html.contains("</script><script>alert(1)"));
        assert!(html.contains("\\u003c/script>"));
        assert!(html.contains("id=\"price-FX-&lt;EUR&gt;\""));
    }

    #[test]
    fn custom_timeframe_gets_its_own_option() {
        let options = render_timeframe_options("4H");
        assert!(options.contains("<option value=\"4H\" selected>4H</option>"));
        assert!(!options.contains("1D\" selected"));
    }

    #[test]
    fn card_ids_match_dashboard_script() {
        assert_eq!(symbol_id("FX:EURUSD"), "FX-EURUSD");
        assert_eq!(symbol_id("CME:ES:FUT"), "CME-ES-FUT");
        assert!(DASHBOARD_TEMPLATE.contains("symbol.replace(/:/g, '-')"));
    }

    #[test]
    fn fill_template_keeps_unknown_markers() {
        let out = fill_template("a {{x}} b {{y}} {{open", |name| (name == "x").then(|| "1".to_string()));
        assert_eq!(out, "a 1 b {{y}} {{open");
    }
}
