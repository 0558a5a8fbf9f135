//! 대시보드 캐시에 미러링되는 도메인 엔티티.
//!
//! 각 엔티티는 고유 키(토큰은 mint, 나머지는 id)로 식별됩니다.
//! 키 이외의 필드는 모두 serde 기본값을 가지므로 부분 페이로드로도
//! 엔티티를 생성할 수 있습니다.

mod position;
mod strategy;
mod token;
mod trade;

pub use position::*;
pub use strategy::*;
pub use token::*;
pub use trade::*;
