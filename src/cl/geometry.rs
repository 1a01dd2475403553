//! Geometric built-ins over floating-point scalars and vectors.

use super::math::{FloatScalar, LaneWise};
use super::vector::{Lanes, Scalar, Vector};

/// Sum of the lane products.
pub fn dot<V: LaneWise>(a: V, b: V) -> V::Lane
where
    V::Lane: FloatScalar,
{
    a.as_lanes()
        .iter()
        .zip(b.as_lanes())
        .fold(V::Lane::ZERO, |acc, (&x, &y)| acc.lane_add(x.lane_mul(y)))
}

pub fn length<V: LaneWise>(p: V) -> V::Lane
where
    V::Lane: FloatScalar,
{
    dot(p, p).lane_sqrt()
}

pub fn distance<V: LaneWise>(p0: V, p1: V) -> V::Lane
where
    V::Lane: FloatScalar,
{
    length(p0.zip_lanes(p1, <V::Lane as Scalar>::lane_sub))
}

/// `p` scaled to unit length. A zero vector is returned unchanged.
pub fn normalize<V: LaneWise>(p: V) -> V
where
    V::Lane: FloatScalar,
{
    let len = length(p);
    if len == V::Lane::ZERO {
        return p;
    }
    let inv = V::Lane::ONE.lane_div(len);
    p.map_lanes(|lane| lane.lane_mul(inv))
}

/// Cross product of 3- and 4-lane vectors. The 4-lane form ignores `w` and
/// returns `w = 0`.
pub trait Cross: Copy {
    fn cross(self, other: Self) -> Self;
}

fn cross3<T: FloatScalar>([ax, ay, az]: [T; 3], [bx, by, bz]: [T; 3]) -> [T; 3] {
    [
        ay.lane_mul(bz).lane_sub(az.lane_mul(by)),
        az.lane_mul(bx).lane_sub(ax.lane_mul(bz)),
        ax.lane_mul(by).lane_sub(ay.lane_mul(bx)),
    ]
}

impl<T: Lanes<3> + FloatScalar> Cross for Vector<T, 3> {
    fn cross(self, other: Self) -> Self {
        Vector::new(cross3(self.to_array(), other.to_array()))
    }
}

impl<T: Lanes<4> + FloatScalar> Cross for Vector<T, 4> {
    fn cross(self, other: Self) -> Self {
        let [ax, ay, az, _] = self.to_array();
        let [bx, by, bz, _] = other.to_array();
        let [x, y, z] = cross3([ax, ay, az], [bx, by, bz]);
        Vector::new([x, y, z, T::ZERO])
    }
}

pub fn cross<V: Cross>(a: V, b: V) -> V {
    a.cross(b)
}
