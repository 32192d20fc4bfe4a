pub const VH_PROPERTY: &str = "--vh";
pub const VW_PROPERTY: &str = "--vw";
pub const SCROLL_CONTAINER_CLASS: &str = "scroll-container";
pub const DOUBLE_TAP_WINDOW_MS: f64 = 300.0;
pub const ORIENTATION_SETTLE_MS: i32 = 100;

/// One percent of the inner viewport, in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportMetrics {
    pub vh: f64,
    pub vw: f64,
}

impl ViewportMetrics {
    pub fn from_inner(width: f64, height: f64) -> Self {
        ViewportMetrics {
            vh: height / 100.0,
            vw: width / 100.0,
        }
    }

    pub fn css(value: f64) -> String {
        format!("{value}px")
    }
}

/// Remembers the previous touch end so a quick second tap can be swallowed.
#[derive(Debug, Default)]
pub struct DoubleTapGuard {
    last: Option<f64>,
}

impl DoubleTapGuard {
    /// Returns whether the default action of this touch end should be prevented.
    pub fn touch_end(&mut self, now: f64) -> bool {
        let suppress = self
            .last
            .is_some_and(|last| now - last <= DOUBLE_TAP_WINDOW_MS);
        self.last = Some(now);
        suppress
    }
}

pub trait ViewportHost {
    type Node;

    /// Inner `(width, height)` of the window, if the environment reports one.
    fn inner_size(&self) -> Option<(f64, f64)>;
    fn set_property(&mut self, name: &str, value: &str);
    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;
    fn has_class(&self, node: &Self::Node, class: &str) -> bool;
}

#[derive(Debug)]
pub enum ViewportEvent<N> {
    Resize,
    OrientationChange,
    /// Delivered once the delay requested for an orientation change has passed.
    Settled,
    TouchEnd { now: f64 },
    TouchMove { target: Option<N> },
}

/// What the event listener has to do after the manager handled an event.
#[derive(Debug, Default, PartialEq)]
pub struct Reaction {
    pub prevent_default: bool,
    /// Deliver [`ViewportEvent::Settled`] after this many milliseconds.
    pub settle_after: Option<i32>,
}

pub struct ViewportManager<H> {
    host: H,
    double_tap: DoubleTapGuard,
}

impl<H: ViewportHost> ViewportManager<H> {
    pub fn initialize(host: H) -> Self {
        let mut manager = ViewportManager {
            host,
            double_tap: DoubleTapGuard::default(),
        };
        manager.recompute_viewport_metrics();
        manager
    }

    pub fn recompute_viewport_metrics(&mut self) -> Option<ViewportMetrics> {
        let Some((width, height)) = self.host.inner_size() else {
            tracing::warn!("viewport size unavailable, keeping previous metrics");
            return None;
        };
        let metrics = ViewportMetrics::from_inner(width, height);
        tracing::debug!("viewport {width}x{height}: {metrics:?}");

        self.host
            .set_property(VH_PROPERTY, &ViewportMetrics::css(metrics.vh));
        self.host
            .set_property(VW_PROPERTY, &ViewportMetrics::css(metrics.vw));
        Some(metrics)
    }

    /// Whether `node` is the scroll container or one of its descendants.
    pub fn in_scroll_container(&self, node: Option<H::Node>) -> bool {
        let mut node = node;
        while let Some(n) = node {
            if self.host.has_class(&n, SCROLL_CONTAINER_CLASS) {
                return true;
            }
            node = self.host.parent(&n);
        }
        false
    }

    pub fn handle(&mut self, event: ViewportEvent<H::Node>) -> Reaction {
        match event {
            ViewportEvent::Resize | ViewportEvent::Settled => {
                self.recompute_viewport_metrics();
                Reaction::default()
            }
            ViewportEvent::OrientationChange => Reaction {
                settle_after: Some(ORIENTATION_SETTLE_MS),
                ..Default::default()
            },
            ViewportEvent::TouchEnd { now } => {
                let suppress = self.double_tap.touch_end(now);
                tracing::trace!("touchend at {now}: suppress = {suppress}");
                Reaction {
                    prevent_default: suppress,
                    ..Default::default()
                }
            }
            ViewportEvent::TouchMove { target } => Reaction {
                prevent_default: self.in_scroll_container(target),
                ..Default::default()
            },
        }
    }
}

/// Nodes are indices into `tree`, each entry being `(classes, parent)`.
#[cfg(test)]
#[derive(Debug, Default)]
struct FakeHost {
    size: (f64, f64),
    properties: std::collections::BTreeMap<String, String>,
    tree: Vec<(&'static str, Option<usize>)>,
}

#[cfg(test)]
impl ViewportHost for FakeHost {
    type Node = usize;

    fn inner_size(&self) -> Option<(f64, f64)> {
        Some(self.size)
    }

    fn set_property(&mut self, name: &str, value: &str) {
        self.properties.insert(name.to_owned(), value.to_owned());
    }

    fn parent(&self, node: &usize) -> Option<usize> {
        self.tree[*node].1
    }

    fn has_class(&self, node: &usize, class: &str) -> bool {
        self.tree[*node].0.split_whitespace().any(|c| c == class)
    }
}

#[test]
fn test_css_value() {
    assert_eq!(ViewportMetrics::css(ViewportMetrics::from_inner(0.0, 800.0).vh), "8px");
    assert_eq!(ViewportMetrics::css(ViewportMetrics::from_inner(823.0, 0.0).vw), "8.23px");
    assert_eq!(ViewportMetrics::css(ViewportMetrics::from_inner(375.0, 0.0).vw), "3.75px");
}

#[test]
fn test_recompute_sets_properties() {
    use pretty_assertions::assert_eq;

    let _ = tracing_subscriber::fmt::try_init();

    let host = FakeHost {
        size: (390.0, 800.0),
        ..Default::default()
    };
    let mut manager = ViewportManager::initialize(host);
    assert_eq!(manager.host.properties[VH_PROPERTY], "8px");
    assert_eq!(manager.host.properties[VW_PROPERTY], "3.9px");

    let before = manager.host.properties.clone();
    manager.recompute_viewport_metrics();
    assert_eq!(manager.host.properties, before);

    manager.host.size = (800.0, 390.0);
    assert_eq!(manager.handle(ViewportEvent::Resize), Reaction::default());
    assert_eq!(manager.host.properties[VH_PROPERTY], "3.9px");
    assert_eq!(manager.host.properties[VW_PROPERTY], "8px");
}

#[test]
fn test_orientation_change_waits_to_settle() {
    let host = FakeHost {
        size: (390.0, 800.0),
        ..Default::default()
    };
    let mut manager = ViewportManager::initialize(host);
    manager.host.size = (800.0, 390.0);

    let reaction = manager.handle(ViewportEvent::OrientationChange);
    assert_eq!(reaction.settle_after, Some(100));
    assert!(!reaction.prevent_default);
    assert_eq!(manager.host.properties[VH_PROPERTY], "8px");

    manager.handle(ViewportEvent::Settled);
    assert_eq!(manager.host.properties[VH_PROPERTY], "3.9px");
}

#[test]
fn test_double_tap() {
    let mut guard = DoubleTapGuard::default();
    assert!(!guard.touch_end(1_000.0));
    assert!(guard.touch_end(1_300.0));
    assert!(!guard.touch_end(1_601.0));
    assert!(guard.touch_end(1_700.0));
    // the reference point moves even when the tap was suppressed
    assert!(guard.touch_end(1_950.0));
    assert!(!guard.touch_end(5_000.0));
}

#[test]
fn test_touch_end_prevents_default() {
    let mut manager = ViewportManager::initialize(FakeHost::default());
    let tap = |now| ViewportEvent::TouchEnd { now };
    assert!(!manager.handle(tap(0.0)).prevent_default);
    assert!(manager.handle(tap(10.0)).prevent_default);
    assert!(!manager.handle(tap(400.0)).prevent_default);
}

#[test]
fn test_touch_move_blocked_in_scroll_container() {
    let host = FakeHost {
        tree: vec![
            ("", None),
            ("page scroll-container", Some(0)),
            ("card", Some(1)),
            ("card-title", Some(2)),
            ("header", Some(0)),
        ],
        ..Default::default()
    };
    let mut manager = ViewportManager::initialize(host);
    let moved = |target| ViewportEvent::TouchMove { target };

    assert!(manager.handle(moved(Some(1))).prevent_default);
    assert!(manager.handle(moved(Some(2))).prevent_default);
    assert!(manager.handle(moved(Some(3))).prevent_default);
    assert!(!manager.handle(moved(Some(4))).prevent_default);
    assert!(!manager.handle(moved(Some(0))).prevent_default);
    assert!(!manager.handle(moved(None)).prevent_default);
}
