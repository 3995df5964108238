use regex::{Regex, Replacer};
use std::{collections::HashMap, sync::LazyLock};

// Smooth Streaming chunk urls look like "QualityLevels({bitrate})/Fragments(video={start time})".
// Some servers spell the placeholders as "{Bitrate}" and "{start_time}", so both forms are accepted.
static TEMPLATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(bitrate|Bitrate|start time|start_time)\}").unwrap());

pub struct ChunkTemplate<'a> {
    args: HashMap<&'a str, String>,
}

impl ChunkTemplate<'_> {
    pub const BITRATE: &'static str = "bitrate";
    pub const START_TIME: &'static str = "start time";

    pub fn new() -> Self {
        Self {
            args: HashMap::with_capacity(2),
        }
    }

    pub fn insert(&mut self, key: &'static str, value: String) -> &mut Self {
        self.args.insert(key, value);
        self
    }

    pub fn resolve(&self, template: &str) -> String {
        TEMPLATE_REGEX
            .replace_all(template, TemplateReplacer(&self.args))
            .to_string()
    }
}

impl Default for ChunkTemplate<'_> {
    fn default() -> Self {
        Self::new()
    }
}

struct TemplateReplacer<'a>(&'a HashMap<&'a str, String>);

impl Replacer for TemplateReplacer<'_> {
    fn replace_append(&mut self, caps: &regex::Captures<'_>, dst: &mut String) {
        let key = match &caps[1] {
            "bitrate" | "Bitrate" => ChunkTemplate::BITRATE,
            _ => ChunkTemplate::START_TIME,
        };
        match self.0.get(key) {
            Some(value) => dst.push_str(value),
            None => dst.push_str(&caps[0]),
        }
    }
}
