use std::{fmt::Write, path::Path};

use anyhow::{Context, Result};
use log::{debug, warn};
use tract_onnx::prelude::*;

use crate::preprocess::InputSize;

type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Wrapper around a YOLOv5 ONNX graph made runnable by tract.
#[derive(Debug)]
pub struct YoloModel {
    runnable: RunnableModel,
}

impl YoloModel {
    /// Load and optimize the ONNX graph for a fixed `[1, 3, H, W]` input.
    ///
    /// When the optimizer rejects the graph, the decluttered (unoptimized) plan is used instead.
    pub fn load<P: AsRef<Path>>(model_path: P, input_size: InputSize) -> Result<Self> {
        let path = model_path.as_ref();
        anyhow::ensure!(path.exists(), "model file not found: {}", path.display());

        let runnable = match load_runnable_model(path, input_size, true) {
            Ok(model) => {
                debug!(
                    "YOLOv5 model {} optimized successfully ({}x{})",
                    path.display(),
                    input_size.width,
                    input_size.height
                );
                model
            }
            Err(opt_err) => {
                let mut chain_msg = String::new();
                for cause in opt_err.chain() {
                    let _ = writeln!(&mut chain_msg, "  - {cause}");
                }
                warn!(
                    "YOLOv5 model {} failed optimized load; falling back to decluttered graph.\nError chain:\n{}",
                    path.display(),
                    chain_msg.trim_end()
                );
                load_runnable_model(path, input_size, false).with_context(|| {
                    format!("fallback to decluttered graph failed after optimize error: {opt_err}")
                })?
            }
        };

        Ok(Self { runnable })
    }

    /// Execute the graph and return its first output, `[1, N, 5 + classes]`.
    pub fn run(&self, input: Tensor) -> Result<Tensor> {
        let outputs = self
            .runnable
            .run(tvec![input.into()])
            .map_err(|e| anyhow::anyhow!("YOLOv5 execution failed: {e}"))?;

        outputs
            .into_iter()
            .next()
            .map(|value| value.into_tensor())
            .ok_or_else(|| anyhow::anyhow!("YOLOv5 model produced no outputs"))
    }
}

fn load_runnable_model(
    path: &Path,
    input_size: InputSize,
    optimized: bool,
) -> Result<RunnableModel> {
    let shape = [1, 3, input_size.height as usize, input_size.width as usize];
    let model = tract_onnx::onnx()
        .model_for_path(path)
        .with_context(|| format!("failed to parse ONNX graph from {}", path.display()))?
        .with_input_fact(0, f32::fact(shape).into())
        .map_err(|e| anyhow::anyhow!("unable to set model input shape {shape:?}: {e}"))?;

    if optimized {
        model
            .into_optimized()
            .map_err(|e| anyhow::anyhow!("unable to optimize YOLOv5 graph: {e}"))?
            .into_runnable()
            .map_err(|e| anyhow::anyhow!("unable to make YOLOv5 graph runnable: {e}"))
    } else {
        model
            .into_typed()
            .map_err(|e| anyhow::anyhow!("unable to type-check YOLOv5 graph: {e}"))?
            .into_decluttered()
            .map_err(|e| anyhow::anyhow!("unable to declutter YOLOv5 graph: {e}"))?
            .into_runnable()
            .map_err(|e| anyhow::anyhow!("unable to make YOLOv5 graph runnable: {e}"))
    }
}
