pub trait InstanceControl {
    fn stop_instances(&self, instance_ids: &[String]) -> Result<(), String>;
}
