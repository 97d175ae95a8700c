use crate::config::RenderConfig;
use crate::ir::Graph;
use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;

/// Render the graph as SVG. Node positions are centers.
pub fn render_svg(graph: &Graph, config: &RenderConfig) -> String {
    let pad = config.padding as f64;
    let (min_x, min_y, max_x, max_y) = extents(graph);
    let shift_x = pad - min_x;
    let shift_y = pad - min_y;
    let width = ((max_x - min_x) + 2.0 * pad).max(200.0);
    let height = ((max_y - min_y) + 2.0 * pad).max(200.0);

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"0 0 {width:.2} {height:.2}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        config.background
    ));

    let centers: HashMap<&str, (f64, f64)> = graph
        .nodes
        .iter()
        .map(|node| (node.id.as_str(), (node.x + shift_x, node.y + shift_y)))
        .collect();

    for edge in &graph.edges {
        let (Some(&(x1, y1)), Some(&(x2, y2))) = (
            centers.get(edge.source.as_str()),
            centers.get(edge.target.as_str()),
        ) else {
            continue;
        };
        svg.push_str(&format!(
            "<line x1=\"{x1:.2}\" y1=\"{y1:.2}\" x2=\"{x2:.2}\" y2=\"{y2:.2}\" stroke=\"{}\" stroke-width=\"1.4\"/>",
            config.edge_color
        ));
    }

    for node in &graph.nodes {
        let cx = node.x + shift_x;
        let cy = node.y + shift_y;
        let fill = if node.locked {
            &config.locked_fill
        } else {
            &config.node_fill
        };
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"6\" ry=\"6\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.4\"/>",
            cx - node.width / 2.0,
            cy - node.height / 2.0,
            node.width,
            node.height,
            fill,
            config.node_stroke
        ));
        if config.show_labels {
            let label = node.label.as_deref().unwrap_or(&node.id);
            let baseline = cy + config.font_size as f64 / 3.0;
            svg.push_str(&format!(
                "<text x=\"{cx:.2}\" y=\"{baseline:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
                config.font_family,
                config.font_size,
                config.edge_color,
                escape_xml(label)
            ));
        }
    }

    svg.push_str("</svg>");
    svg
}

fn extents(graph: &Graph) -> (f64, f64, f64, f64) {
    if graph.nodes.is_empty() {
        return (0.0, 0.0, 0.0, 0.0);
    }
    graph.nodes.iter().fold(
        (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        |(min_x, min_y, max_x, max_y), node| {
            let hw = node.width / 2.0;
            let hh = node.height / 2.0;
            (
                min_x.min(node.x - hw),
                min_y.min(node.y - hh),
                max_x.max(node.x + hw),
                max_y.max(node.y + hh),
            )
        },
    )
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "Inter".to_string();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .or_else(|| usvg::Size::from_wh(800.0, 600.0))
        .ok_or_else(|| anyhow::anyhow!("Invalid render size"))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
