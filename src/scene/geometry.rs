use nalgebra::{Point3, Vector3};

/// Line indices for the 12 edges of a box: 4 bottom, 4 top, 4 vertical
pub const WIREFRAME_EDGE_INDICES: [u32; 24] = [
    0, 1, 1, 2, 2, 3, 3, 0, // bottom
    4, 5, 5, 6, 6, 7, 7, 4, // top
    0, 4, 1, 5, 2, 6, 3, 7, // vertical
];

/// Axis-aligned box outline centered on the origin, drawn as line primitives
#[derive(Debug, Clone, PartialEq)]
pub struct WireframeBox {
    pub extent: Vector3<f64>,
    pub vertices: [Point3<f64>; 8],
    pub indices: [u32; 24],
}

impl WireframeBox {
    /// Build the outline for an extent `(width, height, length)`
    pub fn new(extent: Vector3<f64>) -> Self {
        let (w, h, l) = (extent.x / 2.0, extent.y / 2.0, extent.z / 2.0);

        let vertices = [
            Point3::new(-w, -h, -l), // bottom-left-back
            Point3::new(w, -h, -l),  // bottom-right-back
            Point3::new(w, -h, l),   // bottom-right-front
            Point3::new(-w, -h, l),  // bottom-left-front
            Point3::new(-w, h, -l),  // top-left-back
            Point3::new(w, h, -l),   // top-right-back
            Point3::new(w, h, l),    // top-right-front
            Point3::new(-w, h, l),   // top-left-front
        ];

        Self {
            extent,
            vertices,
            indices: WIREFRAME_EDGE_INDICES,
        }
    }

    /// Number of line primitives
    pub fn line_count(&self) -> usize {
        self.indices.len() / 2
    }

    /// Endpoints of every edge
    pub fn edges(&self) -> impl Iterator<Item = (Point3<f64>, Point3<f64>)> + '_ {
        self.indices
            .chunks_exact(2)
            .map(move |pair| (self.vertices[pair[0] as usize], self.vertices[pair[1] as usize]))
    }
}

/// Geometry attached to a scene node
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Bounding outline of a recognized object
    Wireframe(WireframeBox),
    /// Square-based pyramid used as a spatial marker
    Pyramid { width: f64, height: f64, length: f64 },
    /// Extruded text label
    Text { string: String, extrusion_depth: f64 },
}

impl Geometry {
    pub fn wireframe(extent: Vector3<f64>) -> Self {
        Geometry::Wireframe(WireframeBox::new(extent))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Wireframe(_) => "wireframe",
            Geometry::Pyramid { .. } => "pyramid",
            Geometry::Text { .. } => "text",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wireframe_corners_are_centered() {
        let wireframe = WireframeBox::new(Vector3::new(2.0, 4.0, 6.0));

        assert_eq!(wireframe.vertices[0], Point3::new(-1.0, -2.0, -3.0));
        assert_eq!(wireframe.vertices[6], Point3::new(1.0, 2.0, 3.0));

        let centroid = wireframe
            .vertices
            .iter()
            .fold(Vector3::zeros(), |acc, v| acc + v.coords)
            / 8.0;
        assert_eq!(centroid, Vector3::zeros());
    }

    #[test]
    fn test_wireframe_has_twelve_axis_aligned_edges() {
        let extent = Vector3::new(0.3, 0.2, 0.1);
        let wireframe = WireframeBox::new(extent);

        assert_eq!(wireframe.line_count(), 12);

        let mut lengths: Vec<f64> = wireframe.edges().map(|(a, b)| (b - a).norm()).collect();
        lengths.sort_by(|a, b| a.partial_cmp(b).unwrap());

        // Four edges along each axis
        for (chunk, expected) in lengths.chunks(4).zip([0.1, 0.2, 0.3]) {
            for length in chunk {
                assert!((length - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_every_corner_has_three_edges() {
        let wireframe = WireframeBox::new(Vector3::new(1.0, 1.0, 1.0));
        let mut degree = [0usize; 8];
        for index in wireframe.indices {
            degree[index as usize] += 1;
        }
        assert_eq!(degree, [3; 8]);
    }
}
