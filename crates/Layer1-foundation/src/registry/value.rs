//! Runtime Value - registry에 저장되는 타입 소거 공유 핸들

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 불투명 런타임 값
///
/// Clone은 같은 할당을 공유한다. Registry는 값 자체를 복사하지 않는다.
#[derive(Clone)]
pub struct RuntimeValue {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl RuntimeValue {
    /// 값을 감싸서 생성
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// 이미 공유 중인 값을 재할당 없이 감싸기
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            inner: value,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// 구체 타입 참조로 변환
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// 구체 타입의 공유 핸들로 변환
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }

    /// 저장된 값의 타입 확인
    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// 동일 할당 여부 (값 비교 아님)
    pub fn ptr_eq(&self, other: &RuntimeValue) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// 저장된 값의 타입 이름 (로그/에러 메시지용)
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeValue")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}
