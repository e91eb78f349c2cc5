//! Binding - What a control binds on its element.

use indexmap::IndexMap;

use crate::host::HostEvent;
use crate::stream::{ReplaySubject, Stream, Subject};
use crate::types::PropertyValue;

/// Two-way value channel: one element property plus the event announcing
/// that the user changed it.
pub struct ValueChannel<V> {
    pub(crate) property: String,
    pub(crate) event: String,
    pub(crate) value: ReplaySubject<V>,
}

impl<V: PropertyValue> ValueChannel<V> {
    /// Property read and written on the element (`"value"`, `"checked"`).
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Event signalling a user edit (`"input"`, `"change"`).
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Stream of values. Replays the current one once it is set.
    pub fn stream(&self) -> Stream<V> {
        self.value.stream()
    }
}

/// Raw event streams, one per requested event name.
pub struct EventChannels {
    pub(crate) streams: IndexMap<String, Subject<HostEvent>>,
}

impl EventChannels {
    fn new(names: impl IntoIterator<Item = String>) -> Self {
        Self {
            streams: names.into_iter().map(|name| (name, Subject::new())).collect(),
        }
    }

    /// Stream of occurrences of `name`, if it was requested.
    pub fn stream(&self, name: &str) -> Option<Stream<HostEvent>> {
        self.streams.get(name).map(Subject::stream)
    }

    /// Requested event names, in request order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.streams.keys().map(String::as_str)
    }
}

/// Capabilities of a control.
pub enum Binding<V> {
    /// Element reference only.
    None,
    /// Two-way value binding.
    Value(ValueChannel<V>),
    /// Raw event streams.
    Events(EventChannels),
    /// Both.
    ValueAndEvents(ValueChannel<V>, EventChannels),
}

impl<V> Binding<V> {
    /// The value channel, if bound.
    pub fn value(&self) -> Option<&ValueChannel<V>> {
        match self {
            Binding::Value(channel) | Binding::ValueAndEvents(channel, _) => Some(channel),
            Binding::None | Binding::Events(_) => None,
        }
    }

    /// The event channels, if bound.
    pub fn events(&self) -> Option<&EventChannels> {
        match self {
            Binding::Events(events) | Binding::ValueAndEvents(_, events) => Some(events),
            Binding::None | Binding::Value(_) => None,
        }
    }
}

// =============================================================================
// Config
// =============================================================================

/// Builder describing a control.
///
/// ```ignore
/// let text = create_control(ControlConfig::new().value("value", "input", Some(String::new())));
/// let button = create_control(ControlConfig::<Value>::new().events(["click"]));
/// ```
pub struct ControlConfig<V> {
    value: Option<(String, String, Option<V>)>,
    events: Vec<String>,
}

impl<V> Default for ControlConfig<V> {
    fn default() -> Self {
        Self {
            value: None,
            events: Vec::new(),
        }
    }
}

impl<V: PropertyValue> ControlConfig<V> {
    /// Reference-only control.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `property` two-way, reading it back on `event`.
    ///
    /// With `initial` unset, the first attached element seeds the value.
    pub fn value(mut self, property: &str, event: &str, initial: Option<V>) -> Self {
        self.value = Some((property.to_string(), event.to_string(), initial));
        self
    }

    /// Expose raw streams for each named event.
    pub fn events<I, E>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<String>,
    {
        self.events.extend(names.into_iter().map(Into::into));
        self
    }

    pub(crate) fn into_binding(self) -> Binding<V> {
        let value = self.value.map(|(property, event, initial)| ValueChannel {
            property,
            event,
            value: ReplaySubject::from_option(initial),
        });
        let events = (!self.events.is_empty()).then(|| EventChannels::new(self.events));

        match (value, events) {
            (None, None) => Binding::None,
            (Some(value), None) => Binding::Value(value),
            (None, Some(events)) => Binding::Events(events),
            (Some(value), Some(events)) => Binding::ValueAndEvents(value, events),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_picks_binding_variant() {
        assert!(matches!(ControlConfig::<bool>::new().into_binding(), Binding::None));
        assert!(matches!(
            ControlConfig::new().value("checked", "change", Some(false)).into_binding(),
            Binding::Value(_)
        ));
        assert!(matches!(
            ControlConfig::<bool>::new().events(["click"]).into_binding(),
            Binding::Events(_)
        ));

        let both = ControlConfig::new()
            .value("value", "input", None::<String>)
            .events(["keypress", "blur"])
            .into_binding();
        assert_eq!(both.value().map(|v| v.property().to_string()), Some("value".into()));
        let names: Vec<&str> = both.events().map(|e| e.names().collect()).unwrap_or_default();
        assert_eq!(names, vec!["keypress", "blur"]);
    }
}
