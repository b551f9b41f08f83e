use crate::{
    sampling::SampleRate,
    tags::{Tag, TagSet},
};

/// Metric type.
///
/// Each type maps to a fixed suffix on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricType {
    /// Point-in-time value (`g`).
    Gauge,

    /// Counter delta (`c`).
    Count,

    /// Meter (`m`).
    Meter,

    /// Timing, in milliseconds (`ms`).
    Timer,

    /// Histogram sample (`h`).
    Histogram,

    /// Set member (`s`).
    Set,
}

impl MetricType {
    /// Returns the wire suffix for this type, without the leading separator.
    pub fn suffix(self) -> &'static str {
        self.as_str().trim_start_matches('|')
    }

    fn as_str(self) -> &'static str {
        match self {
            MetricType::Gauge => "|g",
            MetricType::Count => "|c",
            MetricType::Meter => "|m",
            MetricType::Timer => "|ms",
            MetricType::Histogram => "|h",
            MetricType::Set => "|s",
        }
    }
}

/// Numeric metric value.
///
/// Integers are written in decimal, and floating-point values are written in their shortest round-trip form, which
/// always includes a fractional part (`42.0`, `0.5`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MetricValue {
    /// Signed integer.
    Signed(i64),

    /// Unsigned integer.
    Unsigned(u64),

    /// Floating-point number.
    FloatingPoint(f64),
}

macro_rules! impl_from_for_value {
    ($variant:ident, $target:ty, $($source:ty),+) => {
        $(
            impl From<$source> for MetricValue {
                fn from(value: $source) -> Self {
                    MetricValue::$variant(<$target>::from(value))
                }
            }
        )+
    };
}

impl_from_for_value!(Signed, i64, i8, i16, i32, i64);
impl_from_for_value!(Unsigned, u64, u8, u16, u32, u64);
impl_from_for_value!(FloatingPoint, f64, f32, f64);

impl From<usize> for MetricValue {
    fn from(value: usize) -> Self {
        MetricValue::Unsigned(value as u64)
    }
}

impl From<isize> for MetricValue {
    fn from(value: isize) -> Self {
        MetricValue::Signed(value as i64)
    }
}

struct MetricValueFormatter {
    int_writer: itoa::Buffer,
    float_writer: ryu::Buffer,
}

impl MetricValueFormatter {
    fn new() -> Self {
        Self { int_writer: itoa::Buffer::new(), float_writer: ryu::Buffer::new() }
    }

    fn format(&mut self, value: MetricValue) -> &str {
        match value {
            MetricValue::Signed(v) => self.int_writer.format(v),
            MetricValue::Unsigned(v) => self.int_writer.format(v),
            MetricValue::FloatingPoint(v) => self.float_writer.format(v),
        }
    }
}

/// Writes single-metric DogStatsD lines.
///
/// Every line has the form `name:value|type[|@rate][|#key:value,...]`. Nothing is escaped: names, tag keys and tag
/// values containing `:`, `,` or `|` will produce lines that the remote server cannot parse correctly.
///
/// The writer holds on to its buffer between writes, so a long-lived writer does not allocate once its buffer has grown
/// to fit the largest line written.
#[derive(Default)]
pub struct MessageWriter {
    buf: String,
}

impl MessageWriter {
    /// Creates a new `MessageWriter`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a metric line, returning it.
    ///
    /// `maybe_sample_rate` should only be `Some` when the metric was sampled, and sampling was in effect: a rate of `1`
    /// is the implied default and is never written.
    ///
    /// Default tags are written before call-site tags. Keys are not deduplicated across the two, so a call-site tag
    /// sharing a key with a default tag results in both being written. When there are no tags at all, the tag clause
    /// is omitted entirely.
    pub fn write(
        &mut self,
        name: &str,
        value: MetricValue,
        metric_type: MetricType,
        maybe_sample_rate: Option<SampleRate>,
        default_tags: &TagSet,
        tags: &[Tag],
    ) -> &str {
        self.buf.clear();

        self.buf.push_str(name);
        self.buf.push(':');

        let mut formatter = MetricValueFormatter::new();
        self.buf.push_str(formatter.format(value));
        self.buf.push_str(metric_type.as_str());

        if let Some(sample_rate) = maybe_sample_rate.filter(|rate| !rate.is_always()) {
            let mut float_writer = ryu::Buffer::new();
            self.buf.push_str("|@");
            self.buf.push_str(float_writer.format(sample_rate.get()));
        }

        let call_site_tags = tags.iter().map(|tag| (tag.key(), tag.value()));
        let mut wrote_tag = false;
        for (key, value) in default_tags.iter().chain(call_site_tags) {
            // Write the tags prefix before the first tag, and a separator before every other one.
            if wrote_tag {
                self.buf.push(',');
            } else {
                self.buf.push_str("|#");
                wrote_tag = true;
            }

            write_tag(&mut self.buf, key, value);
        }

        &self.buf
    }
}

/// Encodes a single metric line.
///
/// This is a convenience wrapper around [`MessageWriter::write`] for one-off use.
pub fn encode<V>(
    name: &str,
    value: V,
    metric_type: MetricType,
    maybe_sample_rate: Option<SampleRate>,
    default_tags: &TagSet,
    tags: &[Tag],
) -> String
where
    V: Into<MetricValue>,
{
    let mut writer = MessageWriter::new();
    writer.write(name, value.into(), metric_type, maybe_sample_rate, default_tags, tags);
    writer.buf
}

fn write_tag(buf: &mut String, key: &str, value: &str) {
    buf.push_str(key);
    buf.push(':');
    buf.push_str(value);
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use proptest::{collection::vec as arb_vec, prelude::*, prop_oneof, proptest};

    use super::{encode, MessageWriter, MetricType, MetricValue};
    use crate::{
        sampling::SampleRate,
        tags::{Tag, TagSet},
    };

    /// A metric line broken back out into its parts.
    #[derive(Debug, PartialEq)]
    pub(crate) struct ParsedLine {
        pub name: String,
        pub value: String,
        pub suffix: String,
        pub sample_rate: Option<String>,
        pub tags: Vec<(String, String)>,
    }

    impl ParsedLine {
        pub fn tag_map(&self) -> HashMap<&str, &str> {
            self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
        }
    }

    /// Parses a metric line the way a DogStatsD server would.
    pub(crate) fn parse_line(line: &str) -> ParsedLine {
        let (name, rest) = line.split_once(':').expect("line must contain a name separator");
        let mut sections = rest.split('|');
        let value = sections.next().expect("line must contain a value").to_string();
        let suffix = sections.next().expect("line must contain a type").to_string();

        let mut sample_rate = None;
        let mut tags = Vec::new();
        for section in sections {
            if let Some(rate) = section.strip_prefix('@') {
                sample_rate = Some(rate.to_string());
            } else if let Some(raw_tags) = section.strip_prefix('#') {
                tags = raw_tags
                    .split(',')
                    .map(|tag| {
                        let (k, v) = tag.split_once(':').unwrap_or((tag, ""));
                        (k.to_string(), v.to_string())
                    })
                    .collect();
            } else {
                panic!("unexpected section '{section}' in line '{line}'");
            }
        }

        ParsedLine { name: name.to_string(), value, suffix, sample_rate, tags }
    }

    fn default_tags() -> TagSet {
        let mut tags = TagSet::new();
        tags.insert("node_env", "production");
        tags.insert("service", "web");
        tags
    }

    #[test]
    fn suffixes() {
        let cases = [
            (MetricType::Gauge, "g"),
            (MetricType::Count, "c"),
            (MetricType::Meter, "m"),
            (MetricType::Timer, "ms"),
            (MetricType::Histogram, "h"),
            (MetricType::Set, "s"),
        ];

        for (metric_type, suffix) in cases {
            assert_eq!(metric_type.suffix(), suffix);
            assert_eq!(metric_type.as_str(), format!("|{suffix}"));
        }
    }

    #[test]
    fn values() {
        let cases = [
            (MetricValue::from(42), "42"),
            (MetricValue::from(-1i64), "-1"),
            (MetricValue::from(u64::MAX), "18446744073709551615"),
            (MetricValue::from(7usize), "7"),
            (MetricValue::from(42.0), "42.0"),
            (MetricValue::from(3.13232), "3.13232"),
            (MetricValue::from(0.5f32), "0.5"),
        ];

        for (value, expected) in cases {
            let line = encode("v", value, MetricType::Gauge, None, &TagSet::new(), &[]);
            assert_eq!(line, format!("v:{expected}|g"));
        }
    }

    #[test]
    fn lines() {
        let rate = SampleRate::new(0.5).unwrap();

        // Cases are defined as: name, value, type, sample rate, default tags, call-site tags, expected output.
        let cases = [
            ("page.views", 1i64, MetricType::Count, None, TagSet::new(), vec![], "page.views:1|c"),
            (
                "page.views",
                1,
                MetricType::Count,
                None,
                default_tags(),
                vec![],
                "page.views:1|c|#node_env:production,service:web",
            ),
            (
                "request.latency",
                123,
                MetricType::Timer,
                Some(rate),
                [Tag::new("service", "api")].into_iter().collect(),
                vec![],
                "request.latency:123|ms|@0.5|#service:api",
            ),
            (
                "active.users",
                42,
                MetricType::Gauge,
                None,
                default_tags(),
                vec![Tag::new("region", "eu")],
                "active.users:42|g|#node_env:production,service:web,region:eu",
            ),
            (
                "uploads",
                3,
                MetricType::Histogram,
                Some(rate),
                TagSet::new(),
                vec![Tag::new("bucket", "a"), Tag::new("bucket", "b")],
                "uploads:3|h|@0.5|#bucket:a,bucket:b",
            ),
            (
                "visitors",
                1001,
                MetricType::Set,
                Some(SampleRate::ALWAYS),
                TagSet::new(),
                vec![],
                "visitors:1001|s",
            ),
            (
                "bytes",
                -5,
                MetricType::Meter,
                None,
                TagSet::new(),
                vec![Tag::new("empty", "")],
                "bytes:-5|m|#empty:",
            ),
            // Names and tags are written as given, delimiters and all.
            (
                "a|b",
                1,
                MetricType::Count,
                None,
                TagSet::new(),
                vec![Tag::new("k,x", "v:y")],
                "a|b:1|c|#k,x:v:y",
            ),
            (
                "api:v2",
                7,
                MetricType::Gauge,
                Some(rate),
                [Tag::new("host", "a|b")].into_iter().collect(),
                vec![Tag::new("#", "@")],
                "api:v2:7|g|@0.5|#host:a|b,#:@",
            ),
            ("", 0, MetricType::Set, None, TagSet::new(), vec![], ":0|s"),
        ];

        for (name, value, metric_type, rate, default_tags, tags, expected) in cases {
            let line = encode(name, value, metric_type, rate, &default_tags, &tags);
            assert_eq!(line, expected);
        }
    }

    #[test]
    fn call_site_tags_do_not_replace_defaults() {
        let line = encode(
            "requests",
            1,
            MetricType::Count,
            None,
            &default_tags(),
            &[Tag::new("service", "override")],
        );

        assert_eq!(line, "requests:1|c|#node_env:production,service:web,service:override");
    }

    #[test]
    fn writer_reuse() {
        let mut writer = MessageWriter::new();
        let tags = default_tags();

        let first = writer
            .write("first.metric", MetricValue::Signed(1), MetricType::Count, None, &tags, &[])
            .to_string();
        let second = writer.write("b", MetricValue::Signed(2), MetricType::Gauge, None, &TagSet::new(), &[]);

        assert_eq!(first, "first.metric:1|c|#node_env:production,service:web");
        assert_eq!(second, "b:2|g");
    }

    #[test]
    fn writer_keeps_buffer() {
        let mut writer = MessageWriter::new();
        let tags = default_tags();

        let value = MetricValue::Unsigned(u64::MAX);
        writer.write("a.rather.long.metric.name", value, MetricType::Timer, None, &tags, &[]);
        let capacity = writer.buf.capacity();
        let ptr = writer.buf.as_ptr();

        for i in 0..16 {
            writer.write("short", MetricValue::Signed(i), MetricType::Count, None, &tags, &[]);
            assert_eq!(writer.buf.capacity(), capacity);
            assert_eq!(writer.buf.as_ptr(), ptr);
        }
    }

    fn arb_tag() -> impl Strategy<Value = Tag> {
        ("[a-z_]{1,12}", "[a-z0-9.]{0,16}").prop_map(|(k, v)| Tag::new(k, v))
    }

    fn arb_value() -> impl Strategy<Value = MetricValue> {
        prop_oneof![
            any::<i64>().prop_map(MetricValue::Signed),
            any::<u64>().prop_map(MetricValue::Unsigned),
            (-1.0e12..1.0e12f64).prop_map(MetricValue::FloatingPoint),
        ]
    }

    fn arb_metric_type() -> impl Strategy<Value = MetricType> {
        prop_oneof![
            Just(MetricType::Gauge),
            Just(MetricType::Count),
            Just(MetricType::Meter),
            Just(MetricType::Timer),
            Just(MetricType::Histogram),
            Just(MetricType::Set),
        ]
    }

    proptest! {
        #[test]
        fn parse_recovers_parts(
            name in "[a-zA-Z][a-zA-Z0-9._]{0,31}",
            value in arb_value(),
            metric_type in arb_metric_type(),
            maybe_rate in proptest::option::of(0.001..1.0f64),
            default_tags in arb_vec(arb_tag(), 0..4),
            tags in arb_vec(arb_tag(), 0..4),
        ) {
            let default_tags = default_tags.into_iter().collect::<TagSet>();
            let maybe_rate = maybe_rate.and_then(SampleRate::new);

            let line = encode(&name, value, metric_type, maybe_rate, &default_tags, &tags);
            let parsed = parse_line(&line);

            let value = match value {
                MetricValue::Signed(v) => v.to_string(),
                MetricValue::Unsigned(v) => v.to_string(),
                MetricValue::FloatingPoint(v) => {
                    // Values must survive the trip back into a float exactly.
                    let recovered = parsed.value.parse::<f64>().unwrap();
                    prop_assert_eq!(recovered, v);
                    parsed.value.clone()
                }
            };

            let expected_tags = default_tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .chain(tags.iter().map(|t| (t.key().to_string(), t.value().to_string())))
                .collect::<Vec<_>>();

            prop_assert_eq!(parsed.name, name);
            prop_assert_eq!(parsed.value, value);
            prop_assert_eq!(parsed.suffix, metric_type.suffix());
            prop_assert_eq!(parsed.sample_rate.is_some(), maybe_rate.is_some_and(|r| !r.is_always()));
            prop_assert_eq!(parsed.tags, expected_tags);
        }
    }
}
