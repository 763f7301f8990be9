use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use thiserror::Error;

use crate::Score;

pub const SCORECARD_WIDTH: u32 = 600;
pub const SCORECARD_HEIGHT: u32 = 800;
pub const SCORECARD_TITLE: &str = "Bottle Match Scorecard";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Canvas 2D context is not available")]
    SurfaceUnavailable,
    #[error("Drawing failed: {0}")]
    Draw(String),
    #[error("Could not export scorecard image: {0}")]
    Export(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rgba(pub u8, pub u8, pub u8, pub u8);

impl Rgba {
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self(r, g, b, 0xff)
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Rgba(r, g, b, a) = *self;
        if a == 0xff {
            write!(f, "#{r:02x}{g:02x}{b:02x}")
        } else {
            write!(f, "rgba({r},{g},{b},{:.3})", f64::from(a) / 255.0)
        }
    }
}

const DUSK: Rgba = Rgba::opaque(0x2b, 0x2d, 0x42);
const IRIS: Rgba = Rgba::opaque(0x5a, 0x55, 0xa3);
const AMETHYST: Rgba = Rgba::opaque(0x9b, 0x59, 0xb6);
const PANEL: Rgba = Rgba(0xff, 0xff, 0xff, 0x0f);
const GLASS: Rgba = Rgba(0xff, 0xff, 0xff, 0xcc);
const WHITE: Rgba = Rgba::opaque(0xff, 0xff, 0xff);

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GradientStop {
    pub offset: f64,
    pub color: Rgba,
}

/// One step of the scorecard display list.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    /// Fill `rect` with a linear gradient running from `from` to `to`.
    Gradient {
        rect: Rect,
        from: (f64, f64),
        to: (f64, f64),
        stops: Vec<GradientStop>,
    },
    FillRect {
        rect: Rect,
        color: Rgba,
    },
    FillPolygon {
        points: Vec<(f64, f64)>,
        color: Rgba,
    },
    /// Horizontally centered text, `y` is the baseline.
    Text {
        text: String,
        font: &'static str,
        x: f64,
        y: f64,
        color: Rgba,
    },
}

/// Anything that can replay a display list, usually a 2D canvas.
pub trait RenderSurface {
    fn draw(&mut self, op: &DrawOp) -> Result<(), RenderError>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Compliment {
    NiceTry,
    GoodJob,
    Amazing,
    Legendary,
}

impl Compliment {
    pub const fn for_score(score: Score) -> Self {
        match score {
            41.. => Self::Legendary,
            26..=40 => Self::Amazing,
            11..=25 => Self::GoodJob,
            _ => Self::NiceTry,
        }
    }

    pub const fn text(self) -> &'static str {
        use Compliment::*;
        match self {
            NiceTry => "Nice try!",
            GoodJob => "Good job!",
            Amazing => "Amazing!",
            Legendary => "Legendary!",
        }
    }
}

/// Fixed scorecard layout for `score`.
pub fn scorecard_ops(score: Score) -> Vec<DrawOp> {
    let width = f64::from(SCORECARD_WIDTH);
    let height = f64::from(SCORECARD_HEIGHT);
    let center = width / 2.0;
    let bottle_x = center - 80.0;

    vec![
        DrawOp::Gradient {
            rect: Rect {
                x: 0.0,
                y: 0.0,
                w: width,
                h: height,
            },
            from: (0.0, 0.0),
            to: (0.0, height),
            stops: vec![
                GradientStop {
                    offset: 0.0,
                    color: DUSK,
                },
                GradientStop {
                    offset: 0.5,
                    color: IRIS,
                },
                GradientStop {
                    offset: 1.0,
                    color: AMETHYST,
                },
            ],
        },
        DrawOp::FillRect {
            rect: Rect {
                x: 30.0,
                y: 100.0,
                w: width - 60.0,
                h: height - 240.0,
            },
            color: PANEL,
        },
        DrawOp::FillPolygon {
            points: vec![
                (bottle_x, 180.0),
                (bottle_x + 160.0, 180.0),
                (bottle_x + 160.0, 500.0),
                (bottle_x, 500.0),
            ],
            color: GLASS,
        },
        DrawOp::FillRect {
            rect: Rect {
                x: bottle_x + 30.0,
                y: 150.0,
                w: 100.0,
                h: 30.0,
            },
            color: DUSK,
        },
        DrawOp::Text {
            text: String::from(SCORECARD_TITLE),
            font: "36px Fredoka One, sans-serif",
            x: center,
            y: 90.0,
            color: WHITE,
        },
        DrawOp::Text {
            text: format!("Score: {score}"),
            font: "bold 48px Poppins, sans-serif",
            x: center,
            y: 620.0,
            color: WHITE,
        },
        DrawOp::Text {
            text: String::from(Compliment::for_score(score).text()),
            font: "22px Poppins, sans-serif",
            x: center,
            y: 660.0,
            color: WHITE,
        },
    ]
}

/// Draws the scorecard for `score` onto `surface`, stopping at the first failure.
pub fn render<S: RenderSurface>(score: Score, surface: &mut S) -> Result<(), RenderError> {
    scorecard_ops(score)
        .iter()
        .try_for_each(|op| surface.draw(op))
}
