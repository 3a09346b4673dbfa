use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb, Xywh};

/// Contains (x,y) of the center and (width,height) of bbox, in frame pixels
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct Detection {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    #[serde(rename = "p")]
    pub confidence: f32,
    #[serde(rename = "c")]
    pub class: i32,
}

impl Detection {
    pub fn iou(&self, other: &Detection) -> f32 {
        let b1_area = (self.w + 1.) * (self.h + 1.);
        let (xmin, xmax, ymin, ymax) = (self.xmin(), self.xmax(), self.ymin(), self.ymax());

        let b2_area = (other.w + 1.) * (other.h + 1.);

        let i_xmin = xmin.max(other.xmin());
        let i_xmax = xmax.min(other.xmax());
        let i_ymin = ymin.max(other.ymin());
        let i_ymax = ymax.min(other.ymax());
        let i_area = (i_xmax - i_xmin + 1.).max(0.) * (i_ymax - i_ymin + 1.).max(0.);

        (i_area) / (b1_area + b2_area - i_area)
    }

    #[inline(always)]
    pub fn bbox(&self) -> BBox<Xywh> {
        BBox::xywh(self.x, self.y, self.w, self.h)
    }

    /// Absolute corner box, the region cropped for review.
    #[inline]
    pub fn abs_box(&self) -> BBox<Ltrb> {
        self.bbox().as_ltrb()
    }

    /// Center box with every coordinate divided by the frame dimensions,
    /// the form label lines are written in.
    #[inline]
    pub fn normalized(&self, frame_w: f32, frame_h: f32) -> BBox<Xywh> {
        BBox::xywh(
            self.x / frame_w,
            self.y / frame_h,
            self.w / frame_w,
            self.h / frame_h,
        )
    }

    #[inline(always)]
    pub fn xmax(&self) -> f32 {
        self.x + self.w / 2.
    }

    #[inline(always)]
    pub fn ymax(&self) -> f32 {
        self.y + self.h / 2.
    }

    #[inline(always)]
    pub fn xmin(&self) -> f32 {
        self.x - self.w / 2.
    }

    #[inline(always)]
    pub fn ymin(&self) -> f32 {
        self.y - self.h / 2.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f32, y: f32, w: f32, h: f32) -> Detection {
        Detection {
            x,
            y,
            w,
            h,
            confidence: 1.0,
            class: 0,
        }
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = det(100.0, 100.0, 50.0, 40.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_distant_boxes_is_zero() {
        let a = det(50.0, 50.0, 20.0, 20.0);
        let b = det(500.0, 500.0, 20.0, 20.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn normalized_divides_by_frame_dims() {
        let d = det(320.0, 240.0, 64.0, 48.0);
        let n = d.normalized(640.0, 480.0);
        assert_eq!(n.as_slice(), &[0.5, 0.5, 0.1, 0.1]);
    }
}
