// crates/cp_transform/src/offset.rs

//! 局部切平面偏移
//!
//! 在参考点处建立东-北-天 (ENU) 局部坐标系，把任意局部偏移换算为
//! 地心坐标增量，再回到大地坐标、投影到目标 CRS 并转换到全局参考框架。
//!
//! ENU → 地心增量：
//!
//! ```text
//! Δx = -sin(λ)·E − sin(φ)·cos(λ)·N + cos(φ)·cos(λ)·U
//! Δy =  cos(λ)·E − sin(φ)·sin(λ)·N + cos(φ)·sin(λ)·U
//! Δz =  cos(φ)·N + sin(φ)·U
//! ```
//!
//! 上下文构造后只读，可在线程间共享并用于批量计算。

use crate::error::{TransformError, TxResult};
use crate::executor::try_apply;
use cp_geo::{Coord, CrsDefinition, GeodeticEngine, Operation, Point3D, ProjectionFactors};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// 大地坐标
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticPosition {
    /// 经度 (度)
    pub lon: f64,
    /// 纬度 (度)
    pub lat: f64,
    /// 椭球高 (m)
    pub height: f64,
}

impl GeodeticPosition {
    fn from_coord(c: Coord) -> Self {
        Self {
            lon: c.x,
            lat: c.y,
            height: c.z.unwrap_or(0.0),
        }
    }
}

/// 投影坐标
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPosition {
    /// 东坐标 / 第一轴
    pub x: f64,
    /// 北坐标 / 第二轴
    pub y: f64,
}

/// 局部偏移结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalOffsetResult {
    /// 偏移后的大地坐标（CRS 自身基准）
    pub geodetic: GeodeticPosition,
    /// 目标 CRS 中的坐标
    pub projected: ProjectedPosition,
    /// 全局参考框架中的坐标；该框架不可达时为空
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_frame: Option<GeodeticPosition>,
    /// 偏移后的地心坐标
    pub earth_centered: Point3D,
}

/// 局部切平面上下文
#[derive(Debug, Clone)]
pub struct TangentPlaneContext {
    crs: CrsDefinition,
    reference: GeodeticPosition,
    origin: Point3D,
    sin_lon: f64,
    cos_lon: f64,
    sin_lat: f64,
    cos_lat: f64,
    ecef_to_geodetic: Operation,
    geodetic_to_target: Operation,
    geodetic_to_global: Option<Operation>,
}

impl TangentPlaneContext {
    /// 构造上下文
    ///
    /// `lon`/`lat`/`height` 位于 `crs` 所在基准的三维地理坐标系中。
    /// 全局框架不可达时只记录警告，结果中不含全局坐标。
    ///
    /// # Errors
    /// 派生坐标系或参考点换算失败时返回错误
    pub fn build<E: GeodeticEngine + ?Sized>(
        engine: &E,
        crs: CrsDefinition,
        global_frame: Option<&CrsDefinition>,
        lon: f64,
        lat: f64,
        height: f64,
    ) -> TxResult<Self> {
        let geodetic = engine.geodetic_3d(&crs)?;
        let ecef = engine.earth_centered(&geodetic)?;

        let geodetic_to_ecef = engine.direct_operation(&geodetic, &ecef)?;
        let ecef_to_geodetic = engine.direct_operation(&ecef, &geodetic)?;
        let geodetic_to_target = engine.direct_operation(&geodetic, &crs)?;
        let geodetic_to_global = global_frame.and_then(|frame| {
            engine
                .direct_operation(&geodetic, frame)
                .map_err(|e| warn!(frame = %frame, error = %e, "全局参考框架不可达"))
                .ok()
        });

        let origin = try_apply(&geodetic_to_ecef, Coord::xyz(lon, lat, height))?;
        let origin = Point3D::new(origin.x, origin.y, origin.z.unwrap_or(0.0));

        let (sin_lon, cos_lon) = lon.to_radians().sin_cos();
        let (sin_lat, cos_lat) = lat.to_radians().sin_cos();

        Ok(Self {
            crs,
            reference: GeodeticPosition { lon, lat, height },
            origin,
            sin_lon,
            cos_lon,
            sin_lat,
            cos_lat,
            ecef_to_geodetic,
            geodetic_to_target,
            geodetic_to_global,
        })
    }

    /// 目标 CRS
    #[must_use]
    pub fn crs(&self) -> &CrsDefinition {
        &self.crs
    }

    /// 参考点
    #[must_use]
    pub fn reference(&self) -> GeodeticPosition {
        self.reference
    }

    /// 参考点的地心坐标
    #[must_use]
    pub fn origin(&self) -> Point3D {
        self.origin
    }

    /// ENU 偏移对应的地心增量
    #[must_use]
    pub fn enu_to_ecef_delta(&self, east: f64, north: f64, up: f64) -> Point3D {
        let (sl, cl, sp, cp) = (self.sin_lon, self.cos_lon, self.sin_lat, self.cos_lat);
        Point3D::new(
            -sl * east - sp * cl * north + cp * cl * up,
            cl * east - sp * sl * north + cp * sl * up,
            cp * north + sp * up,
        )
    }

    /// 计算局部偏移
    ///
    /// # Errors
    /// 任一换算失败或产生非有限值时返回错误
    pub fn offset(&self, east: f64, north: f64, up: f64) -> TxResult<LocalOffsetResult> {
        if ![east, north, up].iter().all(|v| v.is_finite()) {
            return Err(TransformError::invalid_input(format!(
                "局部偏移必须为有限数: ({east}, {north}, {up})"
            )));
        }

        let ecef = self.origin + self.enu_to_ecef_delta(east, north, up);
        let geodetic = try_apply(&self.ecef_to_geodetic, ecef.to_coord())?;
        let projected = try_apply(&self.geodetic_to_target, geodetic)?;

        let global_frame = match &self.geodetic_to_global {
            Some(op) => match try_apply(op, geodetic) {
                Ok(c) => Some(GeodeticPosition::from_coord(c)),
                Err(e) => {
                    warn!(error = %e, "全局参考框架转换失败，结果中省略");
                    None
                }
            },
            None => None,
        };

        Ok(LocalOffsetResult {
            geodetic: GeodeticPosition::from_coord(geodetic),
            projected: ProjectedPosition {
                x: projected.x,
                y: projected.y,
            },
            global_frame,
            earth_centered: ecef,
        })
    }

    /// 比例因子近似：只用参考点处的收敛角和点比例因子
    ///
    /// 仅用于与 [`offset`](Self::offset) 的结果对比，检查投影引起的漂移。
    /// 网格北相对真北顺时针偏转 γ，故真东、真北在网格中的方向为
    /// (cos γ, sin γ) 和 (−sin γ, cos γ)。
    ///
    /// # Errors
    /// 目标不是投影坐标系时返回错误
    pub fn approximate_offset<E: GeodeticEngine + ?Sized>(
        &self,
        engine: &E,
        east: f64,
        north: f64,
    ) -> TxResult<ProjectedPosition> {
        let factors: ProjectionFactors =
            engine.projection_factors(&self.crs, self.reference.lon, self.reference.lat)?;
        let reference = try_apply(
            &self.geodetic_to_target,
            Coord::xyz(self.reference.lon, self.reference.lat, self.reference.height),
        )?;

        let (sg, cg) = factors.meridian_convergence.to_radians().sin_cos();
        let k = factors.meridional_scale;
        Ok(ProjectedPosition {
            x: reference.x + k * (east * cg - north * sg),
            y: reference.y + k * (east * sg + north * cg),
        })
    }
}
