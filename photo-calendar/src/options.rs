/// Geometry of the calendar document.
///
/// All lengths are in pixels. Values are sanitized before use: non-finite values fall back to
/// the defaults, negative lengths clamp to zero and `max_items_per_row` is at least 1.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LayoutConfig {
    pub container_width: f64,
    pub thumbnail_size: f64,
    /// Space between thumbnails, also applied once at the leading edge of a row.
    pub thumbnail_padding: f64,
    pub header_height: f64,
    /// Space between consecutive month groups (not after the last one).
    pub group_margin: f64,
    /// Items rendered outside the viewport on each side.
    pub overscan: usize,
    pub max_items_per_row: usize,
    /// Upper bound for a single grid's height.
    pub max_grid_height: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            container_width: 800.0,
            thumbnail_size: 160.0,
            thumbnail_padding: 8.0,
            header_height: 48.0,
            group_margin: 24.0,
            overscan: 2,
            max_items_per_row: 20,
            max_grid_height: 50_000_000.0,
        }
    }
}

impl LayoutConfig {
    pub fn with_container_width(mut self, width: f64) -> Self {
        self.container_width = width;
        self
    }

    pub fn with_thumbnail_size(mut self, size: f64) -> Self {
        self.thumbnail_size = size;
        self
    }

    pub fn with_thumbnail_padding(mut self, padding: f64) -> Self {
        self.thumbnail_padding = padding;
        self
    }

    pub fn with_header_height(mut self, height: f64) -> Self {
        self.header_height = height;
        self
    }

    pub fn with_group_margin(mut self, margin: f64) -> Self {
        self.group_margin = margin;
        self
    }

    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    pub fn with_max_items_per_row(mut self, max: usize) -> Self {
        self.max_items_per_row = max;
        self
    }

    pub fn with_max_grid_height(mut self, max: f64) -> Self {
        self.max_grid_height = max;
        self
    }

    /// Height of one thumbnail row (thumbnail plus padding).
    pub fn row_height(&self) -> f64 {
        self.thumbnail_size + self.thumbnail_padding
    }

    /// Returns a copy with every out-of-range value replaced by a safe one.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let mut out = *self;
        out.container_width = sanitize_length("container_width", self.container_width, 0.0);
        out.thumbnail_size = sanitize_length(
            "thumbnail_size",
            self.thumbnail_size,
            defaults.thumbnail_size,
        );
        out.thumbnail_padding = sanitize_length(
            "thumbnail_padding",
            self.thumbnail_padding,
            defaults.thumbnail_padding,
        );
        out.header_height =
            sanitize_length("header_height", self.header_height, defaults.header_height);
        out.group_margin =
            sanitize_length("group_margin", self.group_margin, defaults.group_margin);
        if self.max_items_per_row == 0 {
            cwarn!("max_items_per_row is 0, using 1");
            out.max_items_per_row = 1;
        }
        if !(self.max_grid_height.is_finite() && self.max_grid_height > 0.0) {
            cwarn!(value = self.max_grid_height, "invalid max_grid_height, using default");
            out.max_grid_height = defaults.max_grid_height;
        }
        out
    }

    /// `clamp(floor((width - padding) / (size + padding)), 1, max_items_per_row)`.
    ///
    /// Degenerate geometry (non-positive or non-finite width/size) yields 1.
    pub fn items_per_row(&self) -> usize {
        let max = self.max_items_per_row.max(1);
        let width = self.container_width;
        let size = self.thumbnail_size;
        let cell = self.row_height();
        if !(width.is_finite() && width > 0.0 && size.is_finite() && size > 0.0) {
            return 1;
        }
        if !(cell.is_finite() && cell > 0.0) {
            return 1;
        }
        let n = ((width - self.thumbnail_padding) / cell).floor();
        if !n.is_finite() || n < 1.0 {
            return 1;
        }
        if n >= max as f64 { max } else { n as usize }
    }
}

fn sanitize_length(name: &'static str, value: f64, fallback: f64) -> f64 {
    if !value.is_finite() {
        cwarn!(option = name, value, fallback, "non-finite layout option");
        return fallback;
    }
    if value < 0.0 {
        cwarn!(option = name, value, "negative layout option, clamping to 0");
        return 0.0;
    }
    value
}

/// A partial [`LayoutConfig`] update; `None` fields keep their current value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LayoutConfigPatch {
    pub container_width: Option<f64>,
    pub thumbnail_size: Option<f64>,
    pub thumbnail_padding: Option<f64>,
    pub header_height: Option<f64>,
    pub group_margin: Option<f64>,
    pub overscan: Option<usize>,
    pub max_items_per_row: Option<usize>,
    pub max_grid_height: Option<f64>,
}

impl LayoutConfigPatch {
    pub fn container_width(width: f64) -> Self {
        Self {
            container_width: Some(width),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, config: &mut LayoutConfig) {
        if let Some(v) = self.container_width {
            config.container_width = v;
        }
        if let Some(v) = self.thumbnail_size {
            config.thumbnail_size = v;
        }
        if let Some(v) = self.thumbnail_padding {
            config.thumbnail_padding = v;
        }
        if let Some(v) = self.header_height {
            config.header_height = v;
        }
        if let Some(v) = self.group_margin {
            config.group_margin = v;
        }
        if let Some(v) = self.overscan {
            config.overscan = v;
        }
        if let Some(v) = self.max_items_per_row {
            config.max_items_per_row = v;
        }
        if let Some(v) = self.max_grid_height {
            config.max_grid_height = v;
        }
    }
}
