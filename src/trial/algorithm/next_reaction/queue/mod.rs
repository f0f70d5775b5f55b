/// Binary min-heap over reaction firing times that can update the time of any reaction in place.
#[derive(Debug, Clone, Default)]
pub struct IndexedQueue {
    times: Vec<f64>,
    heap: Vec<usize>,
    position: Vec<usize>,
}

impl IndexedQueue {
    pub fn new(times: Vec<f64>) -> Self {
        let n = times.len();
        let mut queue = Self {
            times,
            heap: (0..n).collect(),
            position: (0..n).collect(),
        };
        for i in (0..n / 2).rev() {
            queue.sift_down(i);
        }
        queue
    }

    /// Reaction with the earliest firing time
    pub fn peek(&self) -> Option<(usize, f64)> {
        self.heap.first().map(|&j| (j, self.times[j]))
    }

    pub fn time(&self, j: usize) -> f64 {
        self.times[j]
    }

    pub fn update(&mut self, j: usize, time: f64) {
        let old = self.times[j];
        self.times[j] = time;
        let i = self.position[j];
        if time < old {
            self.sift_up(i);
        } else {
            self.sift_down(i);
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn less(&self, a: usize, b: usize) -> bool {
        self.times[self.heap[a]] < self.times[self.heap[b]]
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.position[self.heap[a]] = a;
        self.position[self.heap[b]] = b;
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if !self.less(i, parent) {
                break;
            }
            self.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let n = self.heap.len();
        loop {
            let left = 2 * i + 1;
            let right = left + 1;
            let mut smallest = i;
            if left < n && self.less(left, smallest) {
                smallest = left;
            }
            if right < n && self.less(right, smallest) {
                smallest = right;
            }
            if smallest == i {
                break;
            }
            self.swap(i, smallest);
            i = smallest;
        }
    }
}
