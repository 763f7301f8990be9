use bottlematch_core::{
    DrawOp, RenderError, RenderSurface, SCORECARD_HEIGHT, SCORECARD_WIDTH, Score, ScorecardImage,
};
use futures_channel::oneshot;
use js_sys::Uint8Array;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, CanvasRenderingContext2d, HtmlCanvasElement};

use crate::utils::js_error_message;

fn draw_error(err: JsValue) -> RenderError {
    RenderError::Draw(js_error_message(&err))
}

fn export_error(err: JsValue) -> RenderError {
    RenderError::Export(js_error_message(&err))
}

/// 2D canvas backend for the scorecard display list.
pub(crate) struct CanvasSurface {
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    pub(crate) fn new(canvas: &HtmlCanvasElement) -> Result<Self, RenderError> {
        let ctx = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
            .ok_or(RenderError::SurfaceUnavailable)?;
        Ok(Self { ctx })
    }
}

impl RenderSurface for CanvasSurface {
    fn draw(&mut self, op: &DrawOp) -> Result<(), RenderError> {
        let ctx = &self.ctx;
        match op {
            DrawOp::Gradient {
                rect,
                from,
                to,
                stops,
            } => {
                let gradient = ctx.create_linear_gradient(from.0, from.1, to.0, to.1);
                for stop in stops {
                    gradient
                        .add_color_stop(stop.offset as f32, &stop.color.to_string())
                        .map_err(draw_error)?;
                }
                ctx.set_fill_style_canvas_gradient(&gradient);
                ctx.fill_rect(rect.x, rect.y, rect.w, rect.h);
            }
            DrawOp::FillRect { rect, color } => {
                ctx.set_fill_style_str(&color.to_string());
                ctx.fill_rect(rect.x, rect.y, rect.w, rect.h);
            }
            DrawOp::FillPolygon { points, color } => {
                let Some((&(start_x, start_y), rest)) = points.split_first() else {
                    return Ok(());
                };
                ctx.set_fill_style_str(&color.to_string());
                ctx.begin_path();
                ctx.move_to(start_x, start_y);
                for &(x, y) in rest {
                    ctx.line_to(x, y);
                }
                ctx.close_path();
                ctx.fill();
            }
            DrawOp::Text {
                text,
                font,
                x,
                y,
                color,
            } => {
                ctx.set_fill_style_str(&color.to_string());
                ctx.set_font(font);
                ctx.set_text_align("center");
                ctx.fill_text(text, *x, *y).map_err(draw_error)?;
            }
        }
        Ok(())
    }
}

fn create_canvas() -> Result<HtmlCanvasElement, RenderError> {
    let canvas = gloo::utils::document()
        .create_element("canvas")
        .map_err(|_| RenderError::SurfaceUnavailable)?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| RenderError::SurfaceUnavailable)?;
    canvas.set_width(SCORECARD_WIDTH);
    canvas.set_height(SCORECARD_HEIGHT);
    Ok(canvas)
}

async fn canvas_png(canvas: &HtmlCanvasElement) -> Result<Vec<u8>, RenderError> {
    let (sender, receiver) = oneshot::channel::<Option<Blob>>();
    let callback = Closure::once(move |blob: JsValue| {
        let _ = sender.send(blob.dyn_into::<Blob>().ok());
    });
    canvas
        .to_blob(callback.as_ref().unchecked_ref())
        .map_err(export_error)?;

    let blob = receiver
        .await
        .ok()
        .flatten()
        .ok_or_else(|| RenderError::Export("canvas produced no blob".to_string()))?;
    let buffer = JsFuture::from(blob.array_buffer())
        .await
        .map_err(export_error)?;
    Ok(Uint8Array::new(&buffer).to_vec())
}

/// Draws the scorecard for `score` on an offscreen canvas and exports it as PNG.
pub(crate) async fn render_scorecard(score: Score) -> Result<ScorecardImage, RenderError> {
    let canvas = create_canvas()?;
    let mut surface = CanvasSurface::new(&canvas)?;
    bottlematch_core::render(score, &mut surface)?;

    let data_url = canvas
        .to_data_url_with_type("image/png")
        .map_err(export_error)?;
    let png = canvas_png(&canvas).await?;
    log::debug!("scorecard rendered, {} bytes", png.len());

    Ok(ScorecardImage { png, data_url })
}
