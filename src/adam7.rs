//! Utility functions related to handling of
//! [the Adam7 algorithm](https://en.wikipedia.org/wiki/Adam7_algorithm).

/// `(x_start, y_start, x_step, y_step)` of each of the seven passes, in pass order.
///
/// See <http://www.w3.org/TR/PNG/#8InterlaceMethods>.
pub const PASSES: [(u32, u32, u32, u32); 7] = [
    (0, 0, 8, 8),
    (4, 0, 8, 8),
    (0, 4, 4, 8),
    (2, 0, 4, 4),
    (0, 2, 2, 4),
    (1, 0, 2, 2),
    (0, 1, 1, 2),
];

/// Describes which stage of
/// [the Adam7 algorithm](https://en.wikipedia.org/wiki/Adam7_algorithm)
/// applies to a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adam7Info {
    pub(crate) pass: u8,
    pub(crate) line: u32,
    pub(crate) width: u32,
}

impl Adam7Info {
    /// Creates a new `Adam7Info`.  May panic if the arguments are out of range (e.g. if `pass` is
    /// 0 or greater than 7).
    ///
    /// * `pass` corresponds to a pass of the
    ///   [the Adam7 algorithm](https://en.wikipedia.org/wiki/Adam7_algorithm), starting with 1
    /// * `line` is the number of a line within a pass (starting with 0).  For example,
    ///   in an image of height 8, `line` can be between `0..4` in the 7th `pass`
    ///   (those 4 interlaced rows correspond to 2nd, 4th, 6th, and 8th row of the full image).
    /// * `width` describes how many pixels are in an interlaced row.
    pub fn new(pass: u8, line: u32, width: u32) -> Self {
        assert!((1..=7).contains(&pass));
        assert!(width > 0);
        Self { pass, line, width }
    }

    pub fn pass(&self) -> u8 {
        self.pass
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    fn geometry(&self) -> (u32, u32, u32, u32) {
        PASSES[usize::from(self.pass) - 1]
    }

    /// Row of the full image this interlaced row samples.
    pub fn image_row(&self) -> u32 {
        let (_, y_start, _, y_step) = self.geometry();
        y_start + self.line * y_step
    }

    /// Columns of the full image this interlaced row samples, left to right.
    pub fn image_columns(&self) -> impl Iterator<Item = u32> {
        let (x_start, _, x_step, _) = self.geometry();
        (0..self.width).map(move |i| x_start + i * x_step)
    }
}

/// Number of samples starting at `start` with distance `step` that fit into `len`.
fn samples_in(len: u32, start: u32, step: u32) -> u32 {
    if start < len {
        (len - start).div_ceil(step)
    } else {
        0
    }
}

/// This iterator iterates over the different passes of an image Adam7 encoded
/// PNG image
/// The pattern is:
///     16462646
///     77777777
///     56565656
///     77777777
///     36463646
///     77777777
///     56565656
///     77777777
///
/// Passes that would contain no pixels for the given size are skipped.
#[derive(Clone)]
pub struct Adam7Iterator {
    line: u32,
    lines: u32,
    line_width: u32,
    current_pass: u8,
    width: u32,
    height: u32,
}

impl Adam7Iterator {
    pub fn new(width: u32, height: u32) -> Adam7Iterator {
        let mut this = Adam7Iterator {
            line: 0,
            lines: 0,
            line_width: 0,
            current_pass: 1,
            width,
            height,
        };
        this.init_pass();
        this
    }

    /// Calculates the bounds of the current pass
    fn init_pass(&mut self) {
        let (x_start, y_start, x_step, y_step) = PASSES[usize::from(self.current_pass) - 1];
        self.line_width = samples_in(self.width, x_start, x_step);
        self.lines = samples_in(self.height, y_start, y_step);
        self.line = 0;
    }
}

/// Iterates over `Adam7Info`s.
impl Iterator for Adam7Iterator {
    type Item = Adam7Info;
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.line < self.lines && self.line_width > 0 {
                let this_line = self.line;
                self.line += 1;
                return Some(Adam7Info {
                    pass: self.current_pass,
                    line: this_line,
                    width: self.line_width,
                });
            } else if self.current_pass < 7 {
                self.current_pass += 1;
                self.init_pass();
            } else {
                return None;
            }
        }
    }
}

/// Copies pixels from `interlaced_row` into the right location in `img`.
///
/// `img_row_stride` specifies an offset in bytes between subsequent rows of `img`, and
/// `bytes_per_pixel` the size of one pixel in both `img` and `interlaced_row`.
///
/// Example:
///
/// ```
/// use pngcodec::{expand_pass, Adam7Info};
/// let info = Adam7Info::new(5, 0, 4);  // 1st line of 5th pass has 4 pixels.
/// let mut img = vec![0; 8 * 8];
/// let row = vec![1, 2, 3, 4];
/// expand_pass(&mut img, 8, &row, &info, 1);
/// assert_eq!(&img, &[
///     0, 0, 0, 0, 0, 0, 0, 0,
///     0, 0, 0, 0, 0, 0, 0, 0,
///     1, 0, 2, 0, 3, 0, 4, 0,  // <= this is where the 1st line of 5s appears
///     0, 0, 0, 0, 0, 0, 0, 0,  //    in the schematic drawing of the passes at
///     0, 0, 0, 0, 0, 0, 0, 0,  //    https://en.wikipedia.org/wiki/Adam7_algorithm
///     0, 0, 0, 0, 0, 0, 0, 0,
///     0, 0, 0, 0, 0, 0, 0, 0,
///     0, 0, 0, 0, 0, 0, 0, 0,
/// ]);
/// ```
pub fn expand_pass(
    img: &mut [u8],
    img_row_stride: usize,
    interlaced_row: &[u8],
    interlace_info: &Adam7Info,
    bytes_per_pixel: usize,
) {
    let row_start = interlace_info.image_row() as usize * img_row_stride;
    let row = &mut img[row_start..];

    for (x, px) in interlace_info
        .image_columns()
        .zip(interlaced_row.chunks_exact(bytes_per_pixel))
    {
        row[x as usize * bytes_per_pixel..][..bytes_per_pixel].copy_from_slice(px);
    }
}
